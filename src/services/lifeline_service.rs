//! The three one-shot lifelines: Fifty-Fifty, Phone a Friend, Ask the Audience.
//!
//! All randomness flows through an explicit `Rng` parameter so the draws can
//! be exercised deterministically with a seeded generator.

use indexmap::IndexMap;
use rand::{Rng, rng, seq::{IndexedRandom, SliceRandom}};
use tracing::debug;

use crate::{
    dto::{
        game::ActionResponse,
        sse::{AudienceVote, PhoneFriendEvent, TranscriptLine},
    },
    error::ServiceError,
    services::{game_service, sse_events},
    state::{
        SharedState,
        state_machine::{GamePhase, GameRunningPhase},
    },
    trivia::Question,
};

/// Fallback name when the configured friends roster is empty.
const FALLBACK_FRIEND: &str = "Alex";

/// Remove two incorrect answers, leaving the correct one and a random survivor.
///
/// A silent no-op when already used, outside a session, or outside the
/// question phase. The two survivors are re-displayed in a fresh random order.
pub async fn use_fifty_fifty(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    if !in_question_phase(state).await {
        debug!("fifty-fifty ignored outside the question phase");
        return Ok(ActionResponse::ignored());
    }

    let updated = state
        .with_current_game_mut(|maybe| {
            let session = maybe?;
            if !session.started || session.lifelines_used.fifty_fifty {
                return None;
            }
            let question = session.current_question()?.clone();

            let mut generator = rng();
            let remaining = pick_fifty_fifty(&question, &mut generator);
            session.set_displayed_answers(remaining);
            session.lifelines_used.fifty_fifty = true;
            session.touch();
            Some(session.clone())
        })
        .await;

    let Some(session) = updated else {
        debug!("fifty-fifty ignored; already used or no active question");
        return Ok(ActionResponse::ignored());
    };

    sse_events::broadcast_sound_cue(state, sse_events::SOUND_FIFTY_FIFTY);
    sse_events::broadcast_fifty_fifty(state, &session.displayed_answers);
    sse_events::broadcast_lifelines_updated(state, &session);
    game_service::persist_snapshot(state).await;

    Ok(ActionResponse::applied())
}

/// Call a friend who names an answer with a fixed correctness probability.
///
/// Advisory only: the displayed answers and the countdown are untouched.
pub async fn use_phone_friend(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    if !in_question_phase(state).await {
        debug!("phone a friend ignored outside the question phase");
        return Ok(ActionResponse::ignored());
    }

    let rules = state.config().rules().clone();
    let pacing = state.config().pacing().clone();

    let drawn = state
        .with_current_game_mut(|maybe| {
            let session = maybe?;
            if !session.started || session.lifelines_used.phone_friend {
                return None;
            }
            let question = session.current_question()?.clone();

            let mut generator = rng();
            let draw = draw_phone_friend(
                &question,
                &rules.friends,
                rules.phone_friend_correct_probability,
                &mut generator,
            );
            session.lifelines_used.phone_friend = true;
            session.touch();
            Some((draw, question, session.clone()))
        })
        .await;

    let Some((draw, question, session)) = drawn else {
        debug!("phone a friend ignored; already used or no active question");
        return Ok(ActionResponse::ignored());
    };

    let message_ms = pacing.phone_message.as_millis() as u64;
    let transcript = vec![
        TranscriptLine {
            delay_ms: message_ms,
            text: format!(
                "You: Hello, {}! I need your help with this question.",
                draw.friend
            ),
        },
        TranscriptLine {
            delay_ms: message_ms,
            text: format!("{}: Sure, what's the question?", draw.friend),
        },
        TranscriptLine {
            delay_ms: message_ms,
            text: format!("You: {}", question.text),
        },
        TranscriptLine {
            delay_ms: message_ms,
            text: format!("{}: Hmm, I think it's \"{}\".", draw.friend, draw.suggestion),
        },
    ];

    sse_events::broadcast_sound_cue(state, sse_events::SOUND_PHONE_FRIEND);
    sse_events::broadcast_phone_friend(
        state,
        &PhoneFriendEvent {
            friend: draw.friend,
            ringing_ms: pacing.phone_ringing.as_millis() as u64,
            transcript,
            suggestion: draw.suggestion,
        },
    );
    sse_events::broadcast_lifelines_updated(state, &session);
    game_service::persist_snapshot(state).await;

    Ok(ActionResponse::applied())
}

/// Poll a simulated audience over the currently displayed answers.
///
/// Advisory only; the published percentages always sum to exactly 100.
pub async fn use_ask_audience(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    if !in_question_phase(state).await {
        debug!("ask the audience ignored outside the question phase");
        return Ok(ActionResponse::ignored());
    }

    let rules = state.config().rules().clone();

    let polled = state
        .with_current_game_mut(|maybe| {
            let session = maybe?;
            if !session.started || session.lifelines_used.ask_audience {
                return None;
            }
            if session.displayed_answers.is_empty() {
                return None;
            }
            let question = session.current_question()?.clone();

            let mut generator = rng();
            let votes = simulate_audience_votes(
                &session.displayed_answers,
                &question.correct_answer,
                rules.audience_correct_base,
                rules.audience_bonus_spread,
                &mut generator,
            );
            session.lifelines_used.ask_audience = true;
            session.touch();
            Some((votes, session.clone()))
        })
        .await;

    let Some((votes, session)) = polled else {
        debug!("ask the audience ignored; already used or no active question");
        return Ok(ActionResponse::ignored());
    };

    sse_events::broadcast_sound_cue(state, sse_events::SOUND_ASK_AUDIENCE);
    sse_events::broadcast_ask_audience(state, votes);
    sse_events::broadcast_lifelines_updated(state, &session);
    game_service::persist_snapshot(state).await;

    Ok(ActionResponse::applied())
}

async fn in_question_phase(state: &SharedState) -> bool {
    matches!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::Question)
    )
}

/// The correct answer plus one surviving incorrect answer, freshly shuffled.
fn pick_fifty_fifty(question: &Question, rng: &mut impl Rng) -> Vec<String> {
    let mut remaining = vec![question.correct_answer.clone()];
    if let Some(survivor) = question.incorrect_answers.choose(rng) {
        remaining.push(survivor.clone());
    }
    remaining.shuffle(rng);
    remaining
}

/// Result of a phone-a-friend draw.
struct PhoneFriendDraw {
    friend: String,
    suggestion: String,
}

/// Pick a friend and their suggested answer with the given correctness probability.
fn draw_phone_friend(
    question: &Question,
    friends: &[String],
    correct_probability: f64,
    rng: &mut impl Rng,
) -> PhoneFriendDraw {
    let friend = friends
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| FALLBACK_FRIEND.to_string());

    let suggestion = if rng.random_bool(correct_probability) {
        question.correct_answer.clone()
    } else {
        question
            .incorrect_answers
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| question.correct_answer.clone())
    };

    PhoneFriendDraw { friend, suggestion }
}

/// Simulate the audience vote over the displayed answers.
///
/// The correct answer receives `base` percent plus a uniform bonus; the
/// remainder is split across the incorrect answers with uniform random
/// shares, the last one absorbing what is left so the total is exactly 100.
fn simulate_audience_votes(
    displayed: &IndexMap<String, String>,
    correct_answer: &str,
    base: u8,
    bonus_spread: u8,
    rng: &mut impl Rng,
) -> Vec<AudienceVote> {
    let incorrect_count = displayed
        .values()
        .filter(|answer| answer.as_str() != correct_answer)
        .count();

    let correct_share = if incorrect_count == 0 {
        100
    } else {
        base + rng.random_range(0..=bonus_spread)
    };

    let mut remaining = 100u8.saturating_sub(correct_share);
    let mut assigned = 0usize;

    displayed
        .iter()
        .map(|(option, answer)| {
            let percent = if answer.as_str() == correct_answer {
                correct_share
            } else {
                assigned += 1;
                if assigned == incorrect_count {
                    std::mem::take(&mut remaining)
                } else {
                    let share = rng.random_range(0..=remaining);
                    remaining -= share;
                    share
                }
            };

            AudienceVote {
                option: option.clone(),
                answer: answer.clone(),
                percent,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn sample_question() -> Question {
        Question {
            text: "Which planet is known as the Red Planet?".into(),
            correct_answer: "Mars".into(),
            incorrect_answers: vec!["Venus".into(), "Jupiter".into(), "Mercury".into()],
        }
    }

    fn displayed_four() -> IndexMap<String, String> {
        [
            ("A", "Venus"),
            ("B", "Mars"),
            ("C", "Jupiter"),
            ("D", "Mercury"),
        ]
        .into_iter()
        .map(|(label, answer)| (label.to_string(), answer.to_string()))
        .collect()
    }

    #[test]
    fn fifty_fifty_keeps_the_correct_answer_and_one_other() {
        let question = sample_question();

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let remaining = pick_fifty_fifty(&question, &mut rng);

            assert_eq!(remaining.len(), 2);
            assert!(remaining.contains(&question.correct_answer));
            let survivor = remaining
                .iter()
                .find(|answer| **answer != question.correct_answer)
                .unwrap();
            assert!(question.incorrect_answers.contains(survivor));
        }
    }

    #[test]
    fn phone_friend_follows_the_probability_extremes() {
        let question = sample_question();
        let friends = vec!["Sam".to_string()];

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let draw = draw_phone_friend(&question, &friends, 1.0, &mut rng);
            assert_eq!(draw.suggestion, question.correct_answer);
            assert_eq!(draw.friend, "Sam");

            let mut rng = StdRng::seed_from_u64(seed);
            let draw = draw_phone_friend(&question, &friends, 0.0, &mut rng);
            assert!(question.incorrect_answers.contains(&draw.suggestion));
        }
    }

    #[test]
    fn audience_votes_always_sum_to_one_hundred() {
        let question = sample_question();
        let displayed = displayed_four();

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let votes =
                simulate_audience_votes(&displayed, &question.correct_answer, 60, 20, &mut rng);

            assert_eq!(votes.len(), 4);
            let total: u32 = votes.iter().map(|vote| u32::from(vote.percent)).sum();
            assert_eq!(total, 100, "seed {seed} produced a non-normalized vote");

            let correct = votes.iter().find(|vote| vote.answer == "Mars").unwrap();
            assert!(correct.percent >= 60);
        }
    }

    #[test]
    fn audience_votes_cover_the_two_answer_case() {
        let question = sample_question();
        let displayed: IndexMap<String, String> = [("A", "Mars"), ("B", "Venus")]
            .into_iter()
            .map(|(label, answer)| (label.to_string(), answer.to_string()))
            .collect();

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let votes =
                simulate_audience_votes(&displayed, &question.correct_answer, 60, 20, &mut rng);

            let total: u32 = votes.iter().map(|vote| u32::from(vote.percent)).sum();
            assert_eq!(total, 100);
        }
    }

    #[test]
    fn lone_correct_answer_takes_the_whole_vote() {
        let question = sample_question();
        let displayed: IndexMap<String, String> = [("A".to_string(), "Mars".to_string())]
            .into_iter()
            .collect();

        let mut rng = StdRng::seed_from_u64(1);
        let votes = simulate_audience_votes(&displayed, &question.correct_answer, 60, 20, &mut rng);
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].percent, 100);
    }
}
