//! In-memory session aggregate for a single run up the prize ladder.

use std::time::SystemTime;

use indexmap::IndexMap;
use rand::{Rng, seq::SliceRandom};
use uuid::Uuid;

use crate::{
    dao::models::{GameSnapshotEntity, LifelineUsageEntity, QuestionEntity},
    trivia::{Difficulty, Question},
};

/// Labels assigned to answers in presentation order.
pub const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

/// One-shot lifeline flags; each flips to `true` at most once per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifelineUsage {
    /// Fifty-Fifty has been spent.
    pub fifty_fifty: bool,
    /// Phone a Friend has been spent.
    pub phone_friend: bool,
    /// Ask the Audience has been spent.
    pub ask_audience: bool,
}

/// Aggregated state for an in-progress or persisted game session.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Primary key of the session.
    pub id: Uuid,
    /// Difficulty selected when the session started.
    pub difficulty: Difficulty,
    /// Optional category constraint used for the question fetch.
    pub category: Option<u32>,
    /// The fetched question set; fixed once the session starts, never reordered.
    pub questions: Vec<Question>,
    /// Index of the question currently being played; equals `questions.len()` on a win.
    pub current_question_index: usize,
    /// True from game start until terminal resolution.
    pub started: bool,
    /// Lifelines spent so far.
    pub lifelines_used: LifelineUsage,
    /// Seconds remaining on the current question's countdown.
    pub time_left: u32,
    /// Presentation order of the current question's answers, keyed by option label.
    ///
    /// Derived state: rebuilt by every question display and trimmed by
    /// Fifty-Fifty. Not persisted; resume reshuffles from the question.
    pub displayed_answers: IndexMap<String, String>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the session was updated.
    pub updated_at: SystemTime,
}

impl GameSession {
    /// Build a fresh session around a fetched question set.
    pub fn new(
        difficulty: Difficulty,
        category: Option<u32>,
        questions: Vec<Question>,
        countdown_seconds: u32,
    ) -> Self {
        let timestamp = SystemTime::now();

        Self {
            id: Uuid::new_v4(),
            difficulty,
            category,
            questions,
            current_question_index: 0,
            started: true,
            lifelines_used: LifelineUsage::default(),
            time_left: countdown_seconds,
            displayed_answers: IndexMap::new(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// The question currently being played, if any remain.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// 1-indexed number of the question currently being played.
    pub fn question_number(&self) -> usize {
        self.current_question_index + 1
    }

    /// Fisher-Yates shuffle of the current question's answers into a fresh
    /// labeled presentation order. Returns `false` when no question remains.
    pub fn shuffle_answers(&mut self, rng: &mut impl Rng) -> bool {
        let Some(question) = self.questions.get(self.current_question_index) else {
            return false;
        };

        let mut answers: Vec<String> = question.incorrect_answers.clone();
        answers.push(question.correct_answer.clone());
        answers.shuffle(rng);

        self.set_displayed_answers(answers);
        true
    }

    /// Replace the displayed answers, relabeling them from `A` upward.
    pub fn set_displayed_answers(&mut self, answers: Vec<String>) {
        self.displayed_answers = OPTION_LABELS
            .iter()
            .zip(answers)
            .map(|(label, answer)| ((*label).to_string(), answer))
            .collect();
    }

    /// Resolve an option label (`A`-`D`) to the currently displayed answer.
    pub fn displayed_answer(&self, label: &str) -> Option<&str> {
        self.displayed_answers
            .get(&label.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Record a mutation for auditing purposes.
    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            text: value.text,
            correct_answer: value.correct_answer,
            incorrect_answers: value.incorrect_answers,
        }
    }
}

impl From<Question> for QuestionEntity {
    fn from(value: Question) -> Self {
        Self {
            text: value.text,
            correct_answer: value.correct_answer,
            incorrect_answers: value.incorrect_answers,
        }
    }
}

impl From<LifelineUsageEntity> for LifelineUsage {
    fn from(value: LifelineUsageEntity) -> Self {
        Self {
            fifty_fifty: value.fifty_fifty,
            phone_friend: value.phone_friend,
            ask_audience: value.ask_audience,
        }
    }
}

impl From<LifelineUsage> for LifelineUsageEntity {
    fn from(value: LifelineUsage) -> Self {
        Self {
            fifty_fifty: value.fifty_fifty,
            phone_friend: value.phone_friend,
            ask_audience: value.ask_audience,
        }
    }
}

impl From<GameSnapshotEntity> for GameSession {
    fn from(entity: GameSnapshotEntity) -> Self {
        Self {
            id: entity.id,
            difficulty: entity.difficulty,
            category: entity.category,
            questions: entity.questions.into_iter().map(Into::into).collect(),
            current_question_index: entity.current_question_index,
            started: entity.started,
            lifelines_used: entity.lifelines_used.into(),
            time_left: entity.time_left,
            displayed_answers: IndexMap::new(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

impl From<GameSession> for GameSnapshotEntity {
    fn from(session: GameSession) -> Self {
        Self {
            id: session.id,
            difficulty: session.difficulty,
            category: session.category,
            questions: session.questions.into_iter().map(Into::into).collect(),
            current_question_index: session.current_question_index,
            started: session.started,
            lifelines_used: session.lifelines_used.into(),
            time_left: session.time_left,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn sample_questions(count: usize) -> Vec<Question> {
        (1..=count)
            .map(|n| Question {
                text: format!("Question {n}?"),
                correct_answer: format!("Right {n}"),
                incorrect_answers: vec![
                    format!("Wrong {n}a"),
                    format!("Wrong {n}b"),
                    format!("Wrong {n}c"),
                ],
            })
            .collect()
    }

    #[test]
    fn shuffle_keeps_all_four_answers() {
        let mut session = GameSession::new(Difficulty::Easy, None, sample_questions(2), 30);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert!(session.shuffle_answers(&mut rng));
            assert_eq!(session.displayed_answers.len(), 4);

            let mut displayed: Vec<&str> = session
                .displayed_answers
                .values()
                .map(String::as_str)
                .collect();
            displayed.sort_unstable();
            assert_eq!(displayed, ["Right 1", "Wrong 1a", "Wrong 1b", "Wrong 1c"]);
        }
    }

    #[test]
    fn shuffle_fails_once_questions_are_exhausted() {
        let mut session = GameSession::new(Difficulty::Easy, None, sample_questions(1), 30);
        session.current_question_index = 1;

        let mut rng = StdRng::seed_from_u64(7);
        assert!(!session.shuffle_answers(&mut rng));
    }

    #[test]
    fn option_labels_resolve_case_insensitively() {
        let mut session = GameSession::new(Difficulty::Easy, None, sample_questions(1), 30);
        session.set_displayed_answers(vec!["one".into(), "two".into()]);

        assert_eq!(session.displayed_answer("a"), Some("one"));
        assert_eq!(session.displayed_answer("B"), Some("two"));
        assert_eq!(session.displayed_answer("C"), None);
    }

    #[test]
    fn snapshot_round_trip_preserves_session_fields() {
        let mut session = GameSession::new(Difficulty::Hard, Some(9), sample_questions(15), 30);
        session.current_question_index = 6;
        session.lifelines_used.fifty_fifty = true;

        let entity: GameSnapshotEntity = session.clone().into();
        let restored: GameSession = entity.into();

        assert_eq!(restored.id, session.id);
        assert_eq!(restored.difficulty, session.difficulty);
        assert_eq!(restored.category, session.category);
        assert_eq!(restored.questions, session.questions);
        assert_eq!(restored.current_question_index, 6);
        assert_eq!(restored.lifelines_used, session.lifelines_used);
        assert!(restored.displayed_answers.is_empty());
    }
}
