//! Render hooks of the presentation layer, realized as public SSE broadcasts.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        common::{GamePhaseSnapshot, QuestionSnapshot},
        phase::VisiblePhase,
        sse::{
            AnswerRevealedEvent, AnswerSelectedEvent, AskAudienceEvent, AudienceVote,
            FiftyFiftyEvent, GameOverEvent, LadderUpdatedEvent, LifelinesUpdatedEvent,
            PhaseChangedEvent, PhoneFriendEvent, QuestionDisplayedEvent, SafeHavenOfferEvent,
            ServerEvent, SoundCueEvent, SystemStatus, TimerTickEvent,
        },
    },
    services::game_service,
    state::{
        SharedState,
        game::GameSession,
        state_machine::{GamePhase, GameRunningPhase},
    },
};

const EVENT_QUESTION_DISPLAYED: &str = "question.displayed";
const EVENT_TIMER_TICK: &str = "timer.tick";
const EVENT_ANSWER_SELECTED: &str = "answer.selected";
const EVENT_ANSWER_REVEALED: &str = "answer.revealed";
const EVENT_SAFE_HAVEN_OFFER: &str = "safe_haven.offer";
const EVENT_FIFTY_FIFTY: &str = "lifeline.fifty_fifty";
const EVENT_PHONE_FRIEND: &str = "lifeline.phone_friend";
const EVENT_ASK_AUDIENCE: &str = "lifeline.ask_audience";
const EVENT_LIFELINES_UPDATED: &str = "lifelines.updated";
const EVENT_LADDER_UPDATED: &str = "ladder.updated";
const EVENT_GAME_OVER: &str = "game.over";
const EVENT_SOUND_CUE: &str = "sound.cue";
const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Audio cue played when an answer is locked in.
pub const SOUND_ANSWER_SELECT: &str = "answer-select";
/// Audio cue for a correct reveal.
pub const SOUND_CORRECT: &str = "correct";
/// Audio cue for an incorrect reveal or a timeout.
pub const SOUND_INCORRECT: &str = "incorrect";
/// Audio cue for the Fifty-Fifty lifeline.
pub const SOUND_FIFTY_FIFTY: &str = "fifty-fifty";
/// Audio cue for the Phone a Friend lifeline.
pub const SOUND_PHONE_FRIEND: &str = "phone-friend";
/// Audio cue for the Ask the Audience lifeline.
pub const SOUND_ASK_AUDIENCE: &str = "ask-audience";
/// Audio cue played on reaching a safe haven.
pub const SOUND_SAFE_HAVEN: &str = "safe-haven";
/// Audio cue played on walking away.
pub const SOUND_WALK_AWAY: &str = "walk-away";
/// Audio cue played on winning the top prize.
pub const SOUND_WIN: &str = "win";

/// Broadcast a freshly displayed question with its presentation order.
pub fn broadcast_question_displayed(state: &SharedState, session: &GameSession) {
    let rules = state.config().rules();
    let index = session.current_question_index;
    let Some(question) = session.current_question() else {
        return;
    };

    let payload = QuestionDisplayedEvent {
        number: session.question_number(),
        total: session.questions.len(),
        text: question.text.clone(),
        answers: session.displayed_answers.clone(),
        value: rules.question_value(index),
        time_limit: rules.countdown_seconds,
    };
    send_public_event(state, EVENT_QUESTION_DISPLAYED, &payload);

    let ladder = LadderUpdatedEvent {
        question_number: session.question_number(),
        guaranteed_prize: rules.guaranteed_prize(index),
    };
    send_public_event(state, EVENT_LADDER_UPDATED, &ladder);

    broadcast_lifelines_updated(state, session);
}

/// Broadcast the once-per-second countdown tick.
pub fn broadcast_timer_tick(state: &SharedState, seconds_left: u32) {
    let payload = TimerTickEvent { seconds_left };
    send_public_event(state, EVENT_TIMER_TICK, &payload);
}

/// Broadcast that an answer was locked in, before the reveal.
pub fn broadcast_answer_selected(state: &SharedState, option: Option<String>, answer: &str) {
    let payload = AnswerSelectedEvent {
        option,
        answer: answer.to_string(),
    };
    send_public_event(state, EVENT_ANSWER_SELECTED, &payload);
}

/// Broadcast the reveal of a submitted answer's correctness.
pub fn broadcast_answer_revealed(
    state: &SharedState,
    answer: &str,
    correct_answer: &str,
    correct: bool,
) {
    let payload = AnswerRevealedEvent {
        answer: answer.to_string(),
        correct_answer: correct_answer.to_string(),
        correct,
    };
    send_public_event(state, EVENT_ANSWER_REVEALED, &payload);
}

/// Broadcast an open safe-haven walk-away offer.
pub fn broadcast_safe_haven_offer(state: &SharedState, question_number: usize, prize: u64) {
    let payload = SafeHavenOfferEvent {
        question_number,
        guaranteed_prize: prize,
    };
    send_public_event(state, EVENT_SAFE_HAVEN_OFFER, &payload);
}

/// Broadcast the trimmed answer set after Fifty-Fifty.
pub fn broadcast_fifty_fifty(state: &SharedState, answers: &IndexMap<String, String>) {
    let payload = FiftyFiftyEvent {
        answers: answers.clone(),
    };
    send_public_event(state, EVENT_FIFTY_FIFTY, &payload);
}

/// Broadcast the phone conversation transcript.
pub fn broadcast_phone_friend(state: &SharedState, payload: &PhoneFriendEvent) {
    send_public_event(state, EVENT_PHONE_FRIEND, payload);
}

/// Broadcast the audience vote histogram.
pub fn broadcast_ask_audience(state: &SharedState, votes: Vec<AudienceVote>) {
    let payload = AskAudienceEvent { votes };
    send_public_event(state, EVENT_ASK_AUDIENCE, &payload);
}

/// Broadcast the current lifeline availability.
pub fn broadcast_lifelines_updated(state: &SharedState, session: &GameSession) {
    let payload = LifelinesUpdatedEvent(session.lifelines_used.into());
    send_public_event(state, EVENT_LIFELINES_UPDATED, &payload);
}

/// Broadcast a terminal outcome banner.
pub fn broadcast_game_over(state: &SharedState, payload: &GameOverEvent) {
    send_public_event(state, EVENT_GAME_OVER, payload);
}

/// Broadcast a fire-and-forget audio cue.
pub fn broadcast_sound_cue(state: &SharedState, name: &str) {
    let payload = SoundCueEvent {
        name: name.to_string(),
    };
    send_public_event(state, EVENT_SOUND_CUE, &payload);
}

/// Broadcast a degraded-mode change.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
}

/// Broadcast a gameplay phase change notification.
pub async fn broadcast_phase_changed(state: &SharedState) {
    let snapshot = build_phase_snapshot(state).await;
    send_public_event(state, EVENT_PHASE_CHANGED, &PhaseChangedEvent(snapshot));
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

/// Build the shared phase snapshot consumed by SSE clients and `GET /game`.
pub async fn build_phase_snapshot(state: &SharedState) -> GamePhaseSnapshot {
    let machine = state.snapshot().await;
    let phase = machine.phase;
    let degraded = state.is_degraded().await;
    let rules = state.config().rules().clone();

    state
        .read_current_game(|maybe| {
            let mut snapshot = GamePhaseSnapshot::bare(VisiblePhase::from(&phase), degraded);
            snapshot.loading = machine.pending.is_some();
            let Some(session) = maybe else {
                return snapshot;
            };

            match phase {
                GamePhase::GameRunning(GameRunningPhase::Question) => {
                    snapshot = snapshot.with_session(session);
                    snapshot.question = QuestionSnapshot::from_session(
                        session,
                        rules.question_value(session.current_question_index),
                    );
                    snapshot.time_left = Some(session.time_left);
                }
                GamePhase::GameRunning(GameRunningPhase::Reveal) => {
                    snapshot = snapshot.with_session(session);
                    snapshot.question = QuestionSnapshot::from_session(
                        session,
                        rules.question_value(session.current_question_index),
                    );
                }
                GamePhase::GameRunning(GameRunningPhase::SafeHavenPrompt) => {
                    snapshot = snapshot.with_session(session);
                    snapshot.guaranteed_prize =
                        Some(rules.walk_away_prize(session.current_question_index));
                }
                GamePhase::GameOver(outcome) => {
                    snapshot.outcome = Some(outcome.into());
                    snapshot.prize = Some(game_service::prize_for_outcome(
                        &rules,
                        session.current_question_index,
                        outcome,
                    ));
                }
                GamePhase::Idle => {}
            }

            snapshot
        })
        .await
}
