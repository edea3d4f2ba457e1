use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::common::{GamePhaseSnapshot, LifelineAvailability, OutcomeSnapshot};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized JSON data field.
    pub data: String,
}

impl ServerEvent {
    /// Build an event carrying a plain string payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Current degraded flag.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever a question is (re)displayed.
pub struct QuestionDisplayedEvent {
    /// 1-indexed number of the question on the ladder.
    pub number: usize,
    /// Total number of questions in the session.
    pub total: usize,
    /// The question text.
    pub text: String,
    /// Displayed answers keyed by option label.
    #[schema(value_type = Object)]
    pub answers: IndexMap<String, String>,
    /// Reward at stake for this question.
    pub value: u64,
    /// Seconds the player has to answer.
    pub time_limit: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once per second while the countdown runs.
pub struct TimerTickEvent {
    /// Seconds remaining before the question times out.
    pub seconds_left: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast the instant an answer is locked in, before the reveal.
pub struct AnswerSelectedEvent {
    /// Label of the selected option when the selection came by label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    /// The selected answer text.
    pub answer: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the correctness of the submitted answer is revealed.
pub struct AnswerRevealedEvent {
    /// The answer the player selected.
    pub answer: String,
    /// The question's correct answer.
    pub correct_answer: String,
    /// Whether the selection was correct.
    pub correct: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a safe haven is reached and the walk-away offer opens.
pub struct SafeHavenOfferEvent {
    /// 1-indexed number of the question just secured.
    pub question_number: usize,
    /// Reward locked in by walking away now.
    pub guaranteed_prize: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when Fifty-Fifty trims the displayed answers.
pub struct FiftyFiftyEvent {
    /// The two remaining answers keyed by option label.
    #[schema(value_type = Object)]
    pub answers: IndexMap<String, String>,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
/// One line of the phone conversation with a pacing hint.
pub struct TranscriptLine {
    /// Delay before showing this line, in milliseconds.
    pub delay_ms: u64,
    /// The spoken line.
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when Phone a Friend delivers its advisory answer.
pub struct PhoneFriendEvent {
    /// Name of the friend who was called.
    pub friend: String,
    /// How long the phone rings before the conversation starts, in milliseconds.
    pub ringing_ms: u64,
    /// The scripted conversation, in display order.
    pub transcript: Vec<TranscriptLine>,
    /// The answer the friend suggests.
    pub suggestion: String,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
/// One bar of the audience histogram.
pub struct AudienceVote {
    /// Option label of the answer.
    pub option: String,
    /// The answer text.
    pub answer: String,
    /// Percentage of the audience voting for it.
    pub percent: u8,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when Ask the Audience publishes its vote distribution.
pub struct AskAudienceEvent {
    /// Vote shares over the currently displayed answers; always sums to 100.
    pub votes: Vec<AudienceVote>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever lifeline availability changes.
pub struct LifelinesUpdatedEvent(pub LifelineAvailability);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the prize-ladder highlight moves.
pub struct LadderUpdatedEvent {
    /// 1-indexed number of the question currently being played.
    pub question_number: usize,
    /// Reward guaranteed so far by safe havens.
    pub guaranteed_prize: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a session resolves with a terminal outcome.
pub struct GameOverEvent {
    /// How the session ended.
    pub outcome: OutcomeSnapshot,
    /// Final reward.
    pub prize: u64,
    /// Banner message shown to the player.
    pub message: String,
    /// The correct answer of the fatal question, on a loss.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Fire-and-forget audio cue keyed by event name.
pub struct SoundCueEvent {
    /// Name of the sound to play.
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the gameplay phase changes.
pub struct PhaseChangedEvent(pub GamePhaseSnapshot);
