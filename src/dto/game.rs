use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{dto::validation::validate_option_label, trivia::{Category, Difficulty}};

/// Payload used to start a brand-new game session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartGameRequest {
    /// Difficulty of the question set to fetch.
    pub difficulty: Difficulty,
    /// Optional question source category identifier.
    #[serde(default)]
    pub category: Option<u32>,
}

/// Payload submitting an answer for the current question.
///
/// Exactly one of `answer` (the answer text) or `option` (the label of a
/// currently visible answer, the keyboard shortcut path) must be provided.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AnswerRequest {
    /// The selected answer text, matched exactly against the question.
    #[serde(default)]
    pub answer: Option<String>,
    /// The selected option label (`A`-`D`).
    #[serde(default)]
    pub option: Option<String>,
}

impl Validate for AnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match (&self.answer, &self.option) {
            (None, None) => {
                errors.add("answer", ValidationError::new("missing_selection"));
            }
            (Some(_), Some(_)) => {
                errors.add("answer", ValidationError::new("ambiguous_selection"));
            }
            (None, Some(option)) => {
                if let Err(e) = validate_option_label(option) {
                    errors.add("option", e);
                }
            }
            (Some(_), None) => {}
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload deciding a pending safe-haven offer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WalkAwayRequest {
    /// True to cash out, false to continue playing.
    pub confirmed: bool,
}

/// Whether a gameplay command took effect or was silently ignored.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// The command was applied.
    Applied,
    /// The command was not valid in the current state and was ignored.
    Ignored,
}

/// Response for gameplay commands that either apply or no-op.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Disposition of the command.
    pub status: ActionStatus,
}

impl ActionResponse {
    /// The command took effect.
    pub fn applied() -> Self {
        Self {
            status: ActionStatus::Applied,
        }
    }

    /// The command was ignored (invalid in the current state).
    pub fn ignored() -> Self {
        Self {
            status: ActionStatus::Ignored,
        }
    }
}

/// One question category offered by the question source.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySummary {
    /// Source-assigned category identifier.
    pub id: u32,
    /// Human readable category name.
    pub name: String,
}

impl From<Category> for CategorySummary {
    fn from(value: Category) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_request_requires_exactly_one_selection() {
        assert!(AnswerRequest::default().validate().is_err());
        assert!(
            AnswerRequest {
                answer: Some("Paris".into()),
                option: Some("A".into()),
            }
            .validate()
            .is_err()
        );
        assert!(
            AnswerRequest {
                answer: Some("Paris".into()),
                option: None,
            }
            .validate()
            .is_ok()
        );
        assert!(
            AnswerRequest {
                answer: None,
                option: Some("c".into()),
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn answer_request_rejects_unknown_labels() {
        let request = AnswerRequest {
            answer: None,
            option: Some("Z".into()),
        };
        assert!(request.validate().is_err());
    }
}
