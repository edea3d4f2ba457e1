//! The per-question countdown: a cancellable task ticking once per second.

use std::time::Duration;

use tracing::debug;

use crate::{
    services::{game_service, sse_events},
    state::SharedState,
};

/// Arm a fresh countdown for the current question, replacing any running one.
///
/// The session's `time_left` must already be reset by the caller; the task
/// only decrements it, broadcasts ticks, and raises the timeout at zero.
pub async fn arm(state: &SharedState) {
    let generation = {
        let mut slot = state.countdown().lock().await;
        let generation = slot.arm();
        let task_state = state.clone();
        slot.attach(tokio::spawn(run(task_state, generation)));
        generation
    };
    debug!(generation, "countdown armed");
}

async fn run(state: SharedState, generation: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // The first tick of a Tokio interval fires immediately; consume it so the
    // countdown decrements once per elapsed second.
    interval.tick().await;

    loop {
        interval.tick().await;

        let seconds_left = state
            .with_current_game_mut(|maybe| {
                maybe.map(|session| {
                    session.time_left = session.time_left.saturating_sub(1);
                    session.time_left
                })
            })
            .await;

        let Some(seconds_left) = seconds_left else {
            // Session vanished under the timer; nothing left to time out.
            return;
        };

        sse_events::broadcast_timer_tick(&state, seconds_left);

        if seconds_left == 0 {
            game_service::handle_timeout(&state, generation).await;
            return;
        }
    }
}
