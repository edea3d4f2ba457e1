use axum::{Json, Router, extract::State, routing::{get, post}};
use validator::Validate;

use crate::{
    dto::{
        common::GamePhaseSnapshot,
        game::{
            ActionResponse, AnswerRequest, CategorySummary, StartGameRequest, WalkAwayRequest,
        },
    },
    error::AppError,
    services::{game_service, lifeline_service, public_service},
    state::SharedState,
};

/// Routes handling gameplay commands and read-only projections.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/game", get(game_view))
        .route("/game/start", post(start_game))
        .route("/game/resume", post(resume_game))
        .route("/game/answer", post(submit_answer))
        .route("/game/walk-away", post(walk_away))
        .route("/game/lifelines/fifty-fifty", post(use_fifty_fifty))
        .route("/game/lifelines/phone-a-friend", post(use_phone_friend))
        .route("/game/lifelines/ask-the-audience", post(use_ask_audience))
        .route("/categories", get(list_categories))
}

/// Start a fresh game for the chosen difficulty and category.
#[utoipa::path(
    post,
    path = "/game/start",
    tag = "game",
    request_body = StartGameRequest,
    responses(
        (status = 200, description = "Game started (or already running)", body = GamePhaseSnapshot),
        (status = 503, description = "Question fetch failed")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Json(payload): Json<StartGameRequest>,
) -> Result<Json<GamePhaseSnapshot>, AppError> {
    let snapshot = game_service::start_game(&state, payload).await?;
    Ok(Json(snapshot))
}

/// Resume the persisted game session, if one is resumable.
#[utoipa::path(
    post,
    path = "/game/resume",
    tag = "game",
    responses(
        (status = 200, description = "Game resumed", body = GamePhaseSnapshot),
        (status = 404, description = "Nothing to resume")
    )
)]
pub async fn resume_game(
    State(state): State<SharedState>,
) -> Result<Json<GamePhaseSnapshot>, AppError> {
    let snapshot = game_service::resume_game(&state).await?;
    Ok(Json(snapshot))
}

/// Submit an answer for the current question, by text or by option label.
#[utoipa::path(
    post,
    path = "/game/answer",
    tag = "game",
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer processed or ignored", body = ActionResponse),
        (status = 400, description = "Malformed selection")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    let response = game_service::handle_answer(&state, payload).await?;
    Ok(Json(response))
}

/// Decide the pending safe-haven offer.
#[utoipa::path(
    post,
    path = "/game/walk-away",
    tag = "game",
    request_body = WalkAwayRequest,
    responses((status = 200, description = "Offer decided or ignored", body = ActionResponse))
)]
pub async fn walk_away(
    State(state): State<SharedState>,
    Json(payload): Json<WalkAwayRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = game_service::walk_away(&state, payload).await?;
    Ok(Json(response))
}

/// Spend the Fifty-Fifty lifeline on the current question.
#[utoipa::path(
    post,
    path = "/game/lifelines/fifty-fifty",
    tag = "game",
    responses((status = 200, description = "Lifeline applied or ignored", body = ActionResponse))
)]
pub async fn use_fifty_fifty(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = lifeline_service::use_fifty_fifty(&state).await?;
    Ok(Json(response))
}

/// Spend the Phone a Friend lifeline on the current question.
#[utoipa::path(
    post,
    path = "/game/lifelines/phone-a-friend",
    tag = "game",
    responses((status = 200, description = "Lifeline applied or ignored", body = ActionResponse))
)]
pub async fn use_phone_friend(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = lifeline_service::use_phone_friend(&state).await?;
    Ok(Json(response))
}

/// Spend the Ask the Audience lifeline on the current question.
#[utoipa::path(
    post,
    path = "/game/lifelines/ask-the-audience",
    tag = "game",
    responses((status = 200, description = "Lifeline applied or ignored", body = ActionResponse))
)]
pub async fn use_ask_audience(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = lifeline_service::use_ask_audience(&state).await?;
    Ok(Json(response))
}

/// Return the current game phase snapshot.
#[utoipa::path(
    get,
    path = "/game",
    tag = "game",
    responses((status = 200, description = "Current game state", body = GamePhaseSnapshot))
)]
pub async fn game_view(State(state): State<SharedState>) -> Json<GamePhaseSnapshot> {
    Json(public_service::game_view(&state).await)
}

/// Return the question categories offered by the trivia source.
#[utoipa::path(
    get,
    path = "/categories",
    tag = "game",
    responses(
        (status = 200, description = "Available categories", body = [CategorySummary]),
        (status = 503, description = "Category fetch failed")
    )
)]
pub async fn list_categories(
    State(state): State<SharedState>,
) -> Result<Json<Vec<CategorySummary>>, AppError> {
    let categories = public_service::list_categories(&state).await?;
    Ok(Json(categories))
}
