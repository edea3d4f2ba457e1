//! Service helpers that expose read-only public projections of the current game.

use crate::{
    dto::{common::GamePhaseSnapshot, game::CategorySummary},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Return the current phase snapshot exposed to the public UI.
pub async fn game_view(state: &SharedState) -> GamePhaseSnapshot {
    sse_events::build_phase_snapshot(state).await
}

/// Return the question categories offered by the question source.
pub async fn list_categories(state: &SharedState) -> Result<Vec<CategorySummary>, ServiceError> {
    let categories = state.question_source().fetch_categories().await?;
    Ok(categories.into_iter().map(Into::into).collect())
}
