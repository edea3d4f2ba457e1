use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::trivia::Difficulty;

/// Question entry inside a persisted snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// The question text shown to the player.
    #[serde(default)]
    pub text: String,
    /// The single correct answer in its original form.
    #[serde(default)]
    pub correct_answer: String,
    /// The three incorrect answers in source order.
    #[serde(default)]
    pub incorrect_answers: Vec<String>,
}

/// Persisted lifeline flags.
///
/// Older snapshots may lack this structure entirely; every flag defaults to
/// unused on read.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifelineUsageEntity {
    /// Fifty-Fifty has been spent.
    #[serde(default)]
    pub fifty_fifty: bool,
    /// Phone a Friend has been spent.
    #[serde(default)]
    pub phone_friend: bool,
    /// Ask the Audience has been spent.
    #[serde(default)]
    pub ask_audience: bool,
}

/// Aggregate session snapshot persisted by the storage layer.
///
/// The snapshot format carries no schema version, so every field is optional
/// on read and filled with a safe default when missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSnapshotEntity {
    /// Primary key of the session.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Difficulty selected when the session started.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Optional category constraint used for the question fetch.
    #[serde(default)]
    pub category: Option<u32>,
    /// The fetched question set in play order.
    #[serde(default)]
    pub questions: Vec<QuestionEntity>,
    /// Index of the question currently being played.
    #[serde(default)]
    pub current_question_index: usize,
    /// True while the session is in progress and resumable.
    #[serde(default)]
    pub started: bool,
    /// Lifelines spent so far.
    #[serde(default)]
    pub lifelines_used: LifelineUsageEntity,
    /// Seconds remaining on the current question's countdown when saved.
    #[serde(default)]
    pub time_left: u32,
    /// Creation timestamp for auditing/debugging.
    #[serde(default = "SystemTime::now")]
    pub created_at: SystemTime,
    /// Last time the snapshot was updated.
    #[serde(default = "SystemTime::now")]
    pub updated_at: SystemTime,
}
