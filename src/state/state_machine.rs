//! Phase state machine governing question progression and terminal outcomes.

use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// High-level phases the game can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No game is currently running; a new game can be started or resumed.
    Idle,
    /// A game is active and can be in one of the gameplay sub-phases.
    GameRunning(GameRunningPhase),
    /// The last session ended with the given outcome; shown until a new game starts.
    GameOver(Outcome),
}

/// Fine-grained phase while the game is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameRunningPhase {
    /// The current question is displayed and the countdown is running.
    Question,
    /// An answer has been submitted and its correctness is being revealed.
    Reveal,
    /// A safe haven has been reached; the player decides whether to walk away.
    SafeHavenPrompt,
}

/// How a finished session was resolved. Exactly one per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every question was answered correctly.
    Won,
    /// A wrong answer or a timeout ended the game.
    Lost,
    /// The player cashed out at a safe haven.
    WalkedAway,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Begin a fresh session; questions are fetched while the plan is pending.
    StartGame,
    /// Adopt a persisted session and re-enter the stored question.
    ResumeGame,
    /// The player locked in an answer for the current question.
    SubmitAnswer,
    /// The answer was correct and a regular next question follows.
    NextQuestion,
    /// The answer was correct and landed on a safe haven.
    OfferSafeHaven,
    /// The player declined the safe-haven offer and plays on.
    ContinuePlaying,
    /// The countdown reached zero while the question was still open.
    ///
    /// Only valid from the question phase, so a timeout that lost the race
    /// against an answer submission is rejected instead of overriding it.
    TimeExpired,
    /// Resolve the session with a terminal outcome.
    Finish(Outcome),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: GamePhase,
        /// Current phase.
        actual: GamePhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: GamePhase,
    /// Phase the state machine will transition to.
    pub to: GamePhase,
    /// Event that triggered this transition.
    pub event: GameEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: GamePhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<GamePhase>,
}

/// State machine implementing the fifteen-question gameplay flow.
///
/// Transitions follow a two-phase protocol: a transition is first planned
/// (validated against the current phase), its side-effect work runs, then the
/// plan is applied or aborted. While a `StartGame` plan is pending, questions
/// are being fetched; aborting the plan rolls the session start back.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: GamePhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: GameEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<GamePhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        use GameRunningPhase::{Question, Reveal, SafeHavenPrompt};

        let next = match (self.phase, event) {
            (GamePhase::Idle | GamePhase::GameOver(_), GameEvent::StartGame) => {
                GamePhase::GameRunning(Question)
            }
            (GamePhase::Idle | GamePhase::GameOver(_), GameEvent::ResumeGame) => {
                GamePhase::GameRunning(Question)
            }
            (GamePhase::GameRunning(Question), GameEvent::SubmitAnswer) => {
                GamePhase::GameRunning(Reveal)
            }
            (GamePhase::GameRunning(Reveal), GameEvent::NextQuestion) => {
                GamePhase::GameRunning(Question)
            }
            (GamePhase::GameRunning(Reveal), GameEvent::OfferSafeHaven) => {
                GamePhase::GameRunning(SafeHavenPrompt)
            }
            (GamePhase::GameRunning(SafeHavenPrompt), GameEvent::ContinuePlaying) => {
                GamePhase::GameRunning(Question)
            }
            (GamePhase::GameRunning(Question), GameEvent::TimeExpired) => {
                GamePhase::GameOver(Outcome::Lost)
            }
            (GamePhase::GameRunning(_), GameEvent::Finish(outcome)) => GamePhase::GameOver(outcome),
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GamePhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::Idle);
    }

    #[test]
    fn full_winning_run_through_the_ladder() {
        let mut sm = GameStateMachine::new();

        assert_eq!(
            apply(&mut sm, GameEvent::StartGame),
            GamePhase::GameRunning(GameRunningPhase::Question)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::SubmitAnswer),
            GamePhase::GameRunning(GameRunningPhase::Reveal)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::NextQuestion),
            GamePhase::GameRunning(GameRunningPhase::Question)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::SubmitAnswer),
            GamePhase::GameRunning(GameRunningPhase::Reveal)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::OfferSafeHaven),
            GamePhase::GameRunning(GameRunningPhase::SafeHavenPrompt)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::ContinuePlaying),
            GamePhase::GameRunning(GameRunningPhase::Question)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::SubmitAnswer),
            GamePhase::GameRunning(GameRunningPhase::Reveal)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::Finish(Outcome::Won)),
            GamePhase::GameOver(Outcome::Won)
        );
    }

    #[test]
    fn walk_away_resolves_from_safe_haven() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);
        apply(&mut sm, GameEvent::SubmitAnswer);
        apply(&mut sm, GameEvent::OfferSafeHaven);

        assert_eq!(
            apply(&mut sm, GameEvent::Finish(Outcome::WalkedAway)),
            GamePhase::GameOver(Outcome::WalkedAway)
        );
    }

    #[test]
    fn timeout_loses_from_the_question_phase_only() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);

        assert_eq!(
            apply(&mut sm, GameEvent::TimeExpired),
            GamePhase::GameOver(Outcome::Lost)
        );

        // A timeout that raced a submitted answer must not override it.
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);
        apply(&mut sm, GameEvent::SubmitAnswer);

        let err = sm.plan(GameEvent::TimeExpired).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
    }

    #[test]
    fn new_game_can_start_after_game_over() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);
        apply(&mut sm, GameEvent::Finish(Outcome::Lost));

        assert_eq!(
            apply(&mut sm, GameEvent::StartGame),
            GamePhase::GameRunning(GameRunningPhase::Question)
        );
    }

    #[test]
    fn resume_only_allowed_outside_running_game() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);

        let err = sm.plan(GameEvent::ResumeGame).unwrap_err();
        match err {
            PlanError::InvalidTransition(InvalidTransition { from, event }) => {
                assert_eq!(from, GamePhase::GameRunning(GameRunningPhase::Question));
                assert_eq!(event, GameEvent::ResumeGame);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn double_submission_is_rejected_during_reveal() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);
        apply(&mut sm, GameEvent::SubmitAnswer);

        let err = sm.plan(GameEvent::SubmitAnswer).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, GamePhase::GameRunning(GameRunningPhase::Reveal));
                assert_eq!(invalid.event, GameEvent::SubmitAnswer);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn start_is_invalid_while_a_game_is_running() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);

        let err = sm.plan(GameEvent::StartGame).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.event, GameEvent::StartGame);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pending_plan_blocks_further_planning() {
        let mut sm = GameStateMachine::new();
        let _plan = sm.plan(GameEvent::StartGame).unwrap();
        assert_eq!(
            sm.plan(GameEvent::StartGame).unwrap_err(),
            PlanError::AlreadyPending
        );
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::StartGame).unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
        assert_eq!(sm.phase(), GamePhase::Idle);
    }
}
