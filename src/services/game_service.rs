//! Business logic powering the gameplay routes. These helpers coordinate
//! question fetching, snapshot persistence, in-memory session updates, and
//! state-machine transitions while honouring the single-transition-at-a-time
//! requirement.

use rand::rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    config::GameRules,
    dao::models::GameSnapshotEntity,
    dto::{
        common::GamePhaseSnapshot,
        game::{ActionResponse, AnswerRequest, StartGameRequest, WalkAwayRequest},
        sse::GameOverEvent,
    },
    error::ServiceError,
    services::{countdown, sse_events},
    state::{
        SharedState,
        game::GameSession,
        state_machine::{GameEvent, GamePhase, GameRunningPhase, Outcome},
        transitions::run_transition_with_broadcast,
    },
};

/// Banner message for a completed ladder.
const MESSAGE_WON: &str = "Congratulations, you've won!";
/// Banner message for a wrong answer.
const MESSAGE_INCORRECT: &str = "Incorrect answer";
/// Banner message for a countdown that reached zero.
const MESSAGE_TIMES_UP: &str = "Time's up!";
/// Banner message for cashing out at a safe haven.
const MESSAGE_WALKED_AWAY: &str = "Walked away";

/// Start a fresh session for the requested difficulty and category.
///
/// A silent no-op while a game is already active; fetch failures surface to
/// the caller and leave the machine in its pre-game phase.
pub async fn start_game(
    state: &SharedState,
    request: StartGameRequest,
) -> Result<GamePhaseSnapshot, ServiceError> {
    let StartGameRequest {
        difficulty,
        category,
    } = request;

    if matches!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(_)
    ) {
        debug!("start ignored; a game is already active");
        return Ok(sse_events::build_phase_snapshot(state).await);
    }

    let rules = state.config().rules().clone();
    let result = run_transition_with_broadcast(state, GameEvent::StartGame, || async {
        let questions = state
            .question_source()
            .fetch_questions(difficulty, category, rules.question_count)
            .await?;
        let session = GameSession::new(difficulty, category, questions, rules.countdown_seconds);
        info!(session_id = %session.id, difficulty = difficulty.as_str(), "starting game");
        state.set_current_game(Some(session)).await;
        Ok(())
    })
    .await;

    match result {
        Ok(()) => {}
        Err(ServiceError::InvalidState(reason)) => {
            // Lost a race against another entry point; keep the running game.
            debug!(%reason, "start ignored");
            return Ok(sse_events::build_phase_snapshot(state).await);
        }
        Err(err) => return Err(err),
    }

    display_question(state).await;
    Ok(sse_events::build_phase_snapshot(state).await)
}

/// Adopt the persisted snapshot and re-enter the stored question.
///
/// Fails with "nothing to resume" when the snapshot is absent, finished, or
/// no longer marked as started; a stale snapshot is deleted on the way out.
pub async fn resume_game(state: &SharedState) -> Result<GamePhaseSnapshot, ServiceError> {
    if matches!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(_)
    ) {
        debug!("resume ignored; a game is already active");
        return Ok(sse_events::build_phase_snapshot(state).await);
    }

    run_transition_with_broadcast(state, GameEvent::ResumeGame, || async {
        let store = state.require_snapshot_store().await?;
        let Some(snapshot) = store.load().await? else {
            return Err(ServiceError::NotFound("nothing to resume".into()));
        };

        let resumable = snapshot.started
            && !snapshot.questions.is_empty()
            && snapshot.current_question_index < snapshot.questions.len();
        if !resumable {
            if let Err(err) = store.clear().await {
                warn!(error = %err, "failed to clear stale snapshot");
            }
            return Err(ServiceError::NotFound("nothing to resume".into()));
        }

        let mut session: GameSession = snapshot.into();
        session.started = true;
        info!(session_id = %session.id, question = session.question_number(), "resuming game");
        state.set_current_game(Some(session)).await;
        Ok(())
    })
    .await?;

    display_question(state).await;
    Ok(sse_events::build_phase_snapshot(state).await)
}

/// Selection details captured before an answer is evaluated.
struct AnswerContext {
    selected: String,
    correct_answer: String,
    total: usize,
}

/// Evaluate a submitted answer for the current question.
///
/// Valid only while a question is active; submissions arriving during the
/// reveal window or after resolution are silently ignored.
pub async fn handle_answer(
    state: &SharedState,
    request: AnswerRequest,
) -> Result<ActionResponse, ServiceError> {
    let AnswerRequest { answer, option } = request;

    if !matches!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::Question)
    ) {
        debug!("answer ignored outside the question phase");
        return Ok(ActionResponse::ignored());
    }

    let option = option.map(|label| label.trim().to_ascii_uppercase());

    let selection = state
        .read_current_game(|maybe| {
            let session = maybe?;
            let question = session.current_question()?;
            let selected = match (&answer, &option) {
                (Some(answer), _) => answer.clone(),
                (None, Some(label)) => session.displayed_answer(label)?.to_string(),
                (None, None) => return None,
            };
            Some(AnswerContext {
                selected,
                correct_answer: question.correct_answer.clone(),
                total: session.questions.len(),
            })
        })
        .await;

    let Some(ctx) = selection else {
        debug!("answer ignored; selection does not match a displayed answer");
        return Ok(ActionResponse::ignored());
    };

    // Stop the countdown before anything else so a late timeout cannot race
    // the resolution of this answer.
    state.cancel_countdown().await;

    let correct = ctx.selected == ctx.correct_answer;

    let submitted = run_transition_with_broadcast(state, GameEvent::SubmitAnswer, || async {
        sse_events::broadcast_answer_selected(state, option.clone(), &ctx.selected);
        sse_events::broadcast_sound_cue(state, sse_events::SOUND_ANSWER_SELECT);
        Ok(())
    })
    .await;

    if let Err(err) = submitted {
        let response = silence_invalid(err)?;
        // The countdown was already stopped; rearm it if the question is
        // still live after losing the race.
        if matches!(
            state.state_machine_phase().await,
            GamePhase::GameRunning(GameRunningPhase::Question)
        ) {
            countdown::arm(state).await;
        }
        return Ok(response);
    }

    let pacing = state.config().pacing().clone();
    sleep(pacing.answer_select).await;

    sse_events::broadcast_answer_revealed(state, &ctx.selected, &ctx.correct_answer, correct);
    sse_events::broadcast_sound_cue(
        state,
        if correct {
            sse_events::SOUND_CORRECT
        } else {
            sse_events::SOUND_INCORRECT
        },
    );
    sleep(pacing.answer_reveal).await;

    if !correct {
        resolve_game(
            state,
            GameEvent::Finish(Outcome::Lost),
            Outcome::Lost,
            MESSAGE_INCORRECT,
            Some(ctx.correct_answer.clone()),
        )
        .await?;
        return Ok(ActionResponse::applied());
    }

    let advanced = state
        .with_current_game_mut(|maybe| {
            maybe.map(|session| {
                session.current_question_index += 1;
                session.touch();
                session.current_question_index
            })
        })
        .await;
    let Some(new_index) = advanced else {
        return Ok(ActionResponse::ignored());
    };

    let rules = state.config().rules().clone();
    if new_index == ctx.total {
        resolve_game(
            state,
            GameEvent::Finish(Outcome::Won),
            Outcome::Won,
            MESSAGE_WON,
            None,
        )
        .await?;
    } else if rules.is_safe_haven(new_index) {
        run_transition_with_broadcast(state, GameEvent::OfferSafeHaven, || async { Ok(()) })
            .await?;
        sse_events::broadcast_sound_cue(state, sse_events::SOUND_SAFE_HAVEN);
        sse_events::broadcast_safe_haven_offer(state, new_index, rules.walk_away_prize(new_index));
        persist_snapshot(state).await;
    } else {
        run_transition_with_broadcast(state, GameEvent::NextQuestion, || async { Ok(()) }).await?;
        display_question(state).await;
    }

    Ok(ActionResponse::applied())
}

/// Decide a pending safe-haven offer.
///
/// Confirming resolves the session as walked away; declining re-enters the
/// next question. Silently ignored outside the safe-haven prompt.
pub async fn walk_away(
    state: &SharedState,
    request: WalkAwayRequest,
) -> Result<ActionResponse, ServiceError> {
    if !matches!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::SafeHavenPrompt)
    ) {
        debug!("walk away ignored outside the safe-haven prompt");
        return Ok(ActionResponse::ignored());
    }

    state.cancel_countdown().await;

    if request.confirmed {
        match resolve_game(
            state,
            GameEvent::Finish(Outcome::WalkedAway),
            Outcome::WalkedAway,
            MESSAGE_WALKED_AWAY,
            None,
        )
        .await
        {
            Ok(()) => Ok(ActionResponse::applied()),
            Err(err) => silence_invalid(err),
        }
    } else {
        let continued =
            run_transition_with_broadcast(state, GameEvent::ContinuePlaying, || async { Ok(()) })
                .await;
        match continued {
            Ok(()) => {
                display_question(state).await;
                Ok(ActionResponse::applied())
            }
            Err(err) => silence_invalid(err),
        }
    }
}

/// Resolve a countdown that reached zero for the generation that armed it.
///
/// A timeout from a replaced countdown proves itself stale via the generation
/// counter and steps aside.
pub async fn handle_timeout(state: &SharedState, generation: u64) {
    {
        let mut slot = state.countdown().lock().await;
        if !slot.is_current(generation) {
            debug!(generation, "stale timeout ignored");
            return;
        }
        // Detach rather than cancel: this runs inside the countdown task.
        slot.detach();
    }

    if !matches!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::Question)
    ) {
        debug!("timeout ignored outside the question phase");
        return;
    }

    let correct_answer = state
        .read_current_game(|maybe| {
            maybe
                .and_then(GameSession::current_question)
                .map(|question| question.correct_answer.clone())
        })
        .await;

    // TimeExpired is only valid from the question phase, so a timeout that
    // lost the race against an answer submission aborts here.
    match resolve_game(
        state,
        GameEvent::TimeExpired,
        Outcome::Lost,
        MESSAGE_TIMES_UP,
        correct_answer,
    )
    .await
    {
        Ok(()) => {}
        Err(ServiceError::InvalidState(reason)) => debug!(%reason, "timeout ignored"),
        Err(err) => warn!(error = %err, "failed to resolve timeout"),
    }
}

/// Final reward for a session that ended with the given outcome after
/// `questions_answered` correct answers.
pub fn prize_for_outcome(rules: &GameRules, questions_answered: usize, outcome: Outcome) -> u64 {
    match outcome {
        Outcome::Won => rules.top_prize(),
        Outcome::WalkedAway => rules.walk_away_prize(questions_answered),
        Outcome::Lost => rules.guaranteed_prize(questions_answered),
    }
}

/// Shuffle, announce, and arm the countdown for the current question.
async fn display_question(state: &SharedState) {
    let countdown_seconds = state.config().rules().countdown_seconds;

    let displayed = state
        .with_current_game_mut(|maybe| {
            maybe.and_then(|session| {
                let mut generator = rng();
                if !session.shuffle_answers(&mut generator) {
                    return None;
                }
                session.time_left = countdown_seconds;
                session.touch();
                Some(session.clone())
            })
        })
        .await;

    let Some(session) = displayed else {
        warn!("no question available to display");
        return;
    };

    sse_events::broadcast_question_displayed(state, &session);
    countdown::arm(state).await;
    persist_snapshot(state).await;
}

/// Shared terminal resolution for won, lost, and walked-away sessions.
async fn resolve_game(
    state: &SharedState,
    event: GameEvent,
    outcome: Outcome,
    message: &str,
    correct_answer: Option<String>,
) -> Result<(), ServiceError> {
    state.cancel_countdown().await;

    run_transition_with_broadcast(state, event, || async {
        // The snapshot only exists while a game is resumable.
        clear_snapshot(state).await;
        Ok(())
    })
    .await?;

    let prize = {
        let rules = state.config().rules();
        state
            .read_current_game(|maybe| {
                maybe.map(|session| {
                    prize_for_outcome(rules, session.current_question_index, outcome)
                })
            })
            .await
            .unwrap_or(0)
    };

    state
        .with_current_game_mut(|maybe| {
            if let Some(session) = maybe {
                session.started = false;
                session.touch();
            }
        })
        .await;

    let sound = match outcome {
        Outcome::Won => Some(sse_events::SOUND_WIN),
        Outcome::WalkedAway => Some(sse_events::SOUND_WALK_AWAY),
        Outcome::Lost => None,
    };
    if let Some(name) = sound {
        sse_events::broadcast_sound_cue(state, name);
    }

    sse_events::broadcast_game_over(
        state,
        &GameOverEvent {
            outcome: outcome.into(),
            prize,
            message: message.to_string(),
            correct_answer,
        },
    );

    if let Some(notifier) = state.notifier() {
        let notifier = notifier.clone();
        tokio::spawn(async move {
            notifier.notify(prize).await;
        });
    }

    info!(?outcome, prize, "game resolved");
    Ok(())
}

/// Best-effort snapshot save; gameplay continues when storage is down.
pub(crate) async fn persist_snapshot(state: &SharedState) {
    let Some(store) = state.snapshot_store().await else {
        warn!("skipping snapshot save; storage degraded");
        return;
    };

    let Some(entity) = state
        .read_current_game(|maybe| maybe.cloned().map(GameSnapshotEntity::from))
        .await
    else {
        return;
    };

    if let Err(err) = store.save(entity).await {
        warn!(error = %err, "failed to persist session snapshot");
    }
}

/// Best-effort snapshot delete at terminal resolution.
async fn clear_snapshot(state: &SharedState) {
    match state.snapshot_store().await {
        Some(store) => {
            if let Err(err) = store.clear().await {
                warn!(error = %err, "failed to clear session snapshot");
            }
        }
        None => warn!("skipping snapshot clear; storage degraded"),
    }
}

/// Map an invalid-state rejection onto the silent no-op contract.
fn silence_invalid(err: ServiceError) -> Result<ActionResponse, ServiceError> {
    match err {
        ServiceError::InvalidState(reason) => {
            debug!(%reason, "command ignored");
            Ok(ActionResponse::ignored())
        }
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prizes_follow_the_canonical_rules() {
        let rules = GameRules::default();

        assert_eq!(prize_for_outcome(&rules, 15, Outcome::Won), 1_000_000);
        assert_eq!(prize_for_outcome(&rules, 0, Outcome::Lost), 0);
        assert_eq!(prize_for_outcome(&rules, 4, Outcome::Lost), 0);
        assert_eq!(prize_for_outcome(&rules, 7, Outcome::Lost), 1_000);
        assert_eq!(prize_for_outcome(&rules, 12, Outcome::Lost), 32_000);
        assert_eq!(prize_for_outcome(&rules, 5, Outcome::WalkedAway), 1_000);
        assert_eq!(prize_for_outcome(&rules, 10, Outcome::WalkedAway), 32_000);
        assert_eq!(prize_for_outcome(&rules, 13, Outcome::WalkedAway), 250_000);
    }
}
