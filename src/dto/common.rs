use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{format_system_time, phase::VisiblePhase},
    state::{
        game::{GameSession, LifelineUsage},
        state_machine::Outcome,
    },
};

/// Publicly visible terminal outcome of a session.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSnapshot {
    /// Every question was answered correctly.
    Won,
    /// A wrong answer or a timeout ended the game.
    Lost,
    /// The player cashed out at a safe haven.
    WalkedAway,
}

impl From<Outcome> for OutcomeSnapshot {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Won => OutcomeSnapshot::Won,
            Outcome::Lost => OutcomeSnapshot::Lost,
            Outcome::WalkedAway => OutcomeSnapshot::WalkedAway,
        }
    }
}

/// Availability of the three lifelines (`true` means still available).
#[derive(Debug, Serialize, ToSchema, Clone, Copy)]
pub struct LifelineAvailability {
    /// Fifty-Fifty can still be used.
    pub fifty_fifty: bool,
    /// Phone a Friend can still be used.
    pub phone_friend: bool,
    /// Ask the Audience can still be used.
    pub ask_audience: bool,
}

impl From<LifelineUsage> for LifelineAvailability {
    fn from(used: LifelineUsage) -> Self {
        Self {
            fifty_fifty: !used.fifty_fifty,
            phone_friend: !used.phone_friend,
            ask_audience: !used.ask_audience,
        }
    }
}

/// Snapshot of the question currently displayed, without the correct answer.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct QuestionSnapshot {
    /// 1-indexed number of the question on the ladder.
    pub number: usize,
    /// The question text.
    pub text: String,
    /// The currently displayed answers keyed by option label.
    #[schema(value_type = Object)]
    pub answers: IndexMap<String, String>,
    /// Reward at stake for this question.
    pub value: u64,
}

impl QuestionSnapshot {
    /// Build the snapshot for the session's current question, if one is shown.
    pub fn from_session(session: &GameSession, value: u64) -> Option<Self> {
        let question = session.current_question()?;
        if session.displayed_answers.is_empty() {
            return None;
        }
        Some(Self {
            number: session.question_number(),
            text: question.text.clone(),
            answers: session.displayed_answers.clone(),
            value,
        })
    }
}

/// Shared snapshot describing the current gameplay phase and related context.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct GamePhaseSnapshot {
    /// Current phase of the game.
    pub phase: VisiblePhase,
    /// True while a start or resume transition is pending (questions loading).
    pub loading: bool,
    /// True when the backend operates in degraded mode (no storage connection).
    pub degraded: bool,
    /// Identifier of the active session, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// RFC3339 timestamp of when the active session started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// Present while a question is displayed or being revealed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionSnapshot>,
    /// Lifeline availability for the active session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifelines: Option<LifelineAvailability>,
    /// Seconds remaining on the countdown while a question is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
    /// Present during the safe-haven prompt: the reward locked in by walking away.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guaranteed_prize: Option<u64>,
    /// Present once the session ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeSnapshot>,
    /// Final reward of the ended session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<u64>,
}

impl GamePhaseSnapshot {
    /// Empty snapshot for a given phase and degraded flag.
    pub fn bare(phase: VisiblePhase, degraded: bool) -> Self {
        Self {
            phase,
            loading: false,
            degraded,
            session_id: None,
            started_at: None,
            question: None,
            lifelines: None,
            time_left: None,
            guaranteed_prize: None,
            outcome: None,
            prize: None,
        }
    }

    /// Attach session identity fields to the snapshot.
    pub fn with_session(mut self, session: &GameSession) -> Self {
        self.session_id = Some(session.id);
        self.started_at = Some(format_system_time(session.created_at));
        self.lifelines = Some(session.lifelines_used.into());
        self
    }
}
