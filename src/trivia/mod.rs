//! Question source abstraction and the Open Trivia DB client implementation.

pub mod opentdb;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Difficulty tier requested from the question source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Easiest question pool.
    #[default]
    Easy,
    /// Intermediate question pool.
    Medium,
    /// Hardest question pool.
    Hard,
}

impl Difficulty {
    /// Wire value used in question source query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// A multiple-choice trivia question, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// The question text shown to the player.
    pub text: String,
    /// The single correct answer, kept in its original form for exact matching.
    pub correct_answer: String,
    /// The three incorrect answers in source order.
    pub incorrect_answers: Vec<String>,
}

/// A question category offered by the question source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    /// Source-assigned category identifier.
    pub id: u32,
    /// Human readable category name.
    pub name: String,
}

/// Result alias for question source operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failures raised while retrieving questions or categories.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The question source could not be reached.
    #[error("failed to reach the trivia service")]
    Transport {
        /// Underlying HTTP failure.
        #[source]
        source: reqwest::Error,
    },
    /// The response payload could not be decoded.
    #[error("failed to decode the trivia service response")]
    Decode {
        /// Underlying decoding failure.
        #[source]
        source: reqwest::Error,
    },
    /// The question source answered with a non-success API response code.
    #[error("trivia service rejected the request (response code {code})")]
    ResponseCode {
        /// The API response code returned by the source.
        code: u8,
    },
    /// The source returned fewer questions than requested.
    #[error("trivia service returned {got} questions, expected {expected}")]
    ShortResults {
        /// Number of questions requested.
        expected: usize,
        /// Number of questions actually returned.
        got: usize,
    },
}

/// Abstraction over the trivia question provider.
pub trait QuestionSource: Send + Sync {
    /// Fetch `amount` multiple-choice questions for the given selection.
    fn fetch_questions(
        &self,
        difficulty: Difficulty,
        category: Option<u32>,
        amount: usize,
    ) -> BoxFuture<'static, FetchResult<Vec<Question>>>;

    /// Fetch the list of categories the source can filter by.
    fn fetch_categories(&self) -> BoxFuture<'static, FetchResult<Vec<Category>>>;
}
