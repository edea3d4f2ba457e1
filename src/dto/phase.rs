use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::{GamePhase, GameRunningPhase};

/// Publicly visible game phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// No active game.
    Idle,
    /// A question is displayed and the countdown is running.
    Question,
    /// The submitted answer is being revealed.
    Reveal,
    /// A safe haven offer awaits the player's decision.
    SafeHaven,
    /// The last session ended; the outcome banner is displayed.
    GameOver,
}

impl From<&GamePhase> for VisiblePhase {
    fn from(value: &GamePhase) -> Self {
        match value {
            GamePhase::Idle => VisiblePhase::Idle,
            GamePhase::GameRunning(GameRunningPhase::Question) => VisiblePhase::Question,
            GamePhase::GameRunning(GameRunningPhase::Reveal) => VisiblePhase::Reveal,
            GamePhase::GameRunning(GameRunningPhase::SafeHavenPrompt) => VisiblePhase::SafeHaven,
            GamePhase::GameOver(_) => VisiblePhase::GameOver,
        }
    }
}
