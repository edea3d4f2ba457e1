use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Millionaire Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::game::start_game,
        crate::routes::game::resume_game,
        crate::routes::game::submit_answer,
        crate::routes::game::walk_away,
        crate::routes::game::use_fifty_fifty,
        crate::routes::game::use_phone_friend,
        crate::routes::game::use_ask_audience,
        crate::routes::game::game_view,
        crate::routes::game::list_categories,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::StartGameRequest,
            crate::dto::game::AnswerRequest,
            crate::dto::game::WalkAwayRequest,
            crate::dto::game::ActionResponse,
            crate::dto::game::CategorySummary,
            crate::dto::common::GamePhaseSnapshot,
            crate::dto::common::QuestionSnapshot,
            crate::dto::common::LifelineAvailability,
            crate::dto::common::OutcomeSnapshot,
            crate::dto::phase::VisiblePhase,
            crate::trivia::Difficulty,
        )
    ),
    tags(
        (name = "game", description = "Gameplay commands and projections"),
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events stream"),
    )
)]
pub struct ApiDoc;
