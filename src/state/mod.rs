//! Shared application state: the session, the phase machine, and side channels.

/// Countdown task bookkeeping.
pub mod countdown;
/// Session aggregate and lifeline data.
pub mod game;
mod sse;
/// Phase state machine with planned transitions.
pub mod state_machine;
/// Transition helpers that pair state changes with broadcasts.
pub mod transitions;

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::snapshot_store::SnapshotStore,
    error::ServiceError,
    services::notification::Notifier,
    state::{countdown::CountdownSlot, game::GameSession, state_machine::GamePhase},
    trivia::QuestionSource,
};

pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::{
    sse::SseState,
    state_machine::{GameEvent, GameStateMachine},
};

/// Cheaply cloneable handle to the application state.
pub type SharedState = Arc<AppState>;
/// Upper bound on the side-effect work of a single planned transition.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Central application state storing the session, phase machine, and adapters.
pub struct AppState {
    config: AppConfig,
    questions: Arc<dyn QuestionSource>,
    notifier: Option<Notifier>,
    snapshot_store: RwLock<Option<Arc<dyn SnapshotStore>>>,
    sse: SseState,
    game: RwLock<GameStateMachine>,
    current_game: RwLock<Option<GameSession>>,
    countdown: Mutex<CountdownSlot>,
    degraded: watch::Sender<bool>,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        questions: Arc<dyn QuestionSource>,
        notifier: Option<Notifier>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            questions,
            notifier,
            snapshot_store: RwLock::new(None),
            sse: SseState::new(16),
            game: RwLock::new(GameStateMachine::new()),
            current_game: RwLock::new(None),
            countdown: Mutex::new(CountdownSlot::default()),
            degraded: degraded_tx,
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    /// Runtime configuration shared across the application.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The question source adapter serving this instance.
    pub fn question_source(&self) -> Arc<dyn QuestionSource> {
        self.questions.clone()
    }

    /// The notification adapter, when the hosting environment registered one.
    pub fn notifier(&self) -> Option<&Notifier> {
        self.notifier.as_ref()
    }

    /// Obtain a handle to the current snapshot store, if one is installed.
    pub async fn snapshot_store(&self) -> Option<Arc<dyn SnapshotStore>> {
        let guard = self.snapshot_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the snapshot store or fail with a degraded-mode error.
    pub async fn require_snapshot_store(&self) -> Result<Arc<dyn SnapshotStore>, ServiceError> {
        self.snapshot_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new snapshot store implementation and leave degraded mode.
    pub async fn install_snapshot_store(&self, store: Arc<dyn SnapshotStore>) {
        {
            let mut guard = self.snapshot_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current snapshot store and enter degraded mode.
    pub async fn clear_snapshot_store(&self) {
        {
            let mut guard = self.snapshot_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.snapshot_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Snapshot the current phase of the shared game state machine.
    pub async fn state_machine_phase(&self) -> GamePhase {
        self.game.read().await.phase()
    }

    /// Read the currently active game session through a closure.
    pub async fn read_current_game<F, T>(&self, f: F) -> T
    where
        F: FnOnce(Option<&GameSession>) -> T,
    {
        let guard = self.current_game.read().await;
        f(guard.as_ref())
    }

    /// Mutate the currently active game session through a closure.
    pub async fn with_current_game_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(Option<&mut GameSession>) -> T,
    {
        let mut guard = self.current_game.write().await;
        f(guard.as_mut())
    }

    /// Replace (or drop) the active session wholesale.
    pub async fn set_current_game(&self, session: Option<GameSession>) {
        let mut guard = self.current_game.write().await;
        *guard = session;
    }

    /// The countdown task slot for the active question.
    pub fn countdown(&self) -> &Mutex<CountdownSlot> {
        &self.countdown
    }

    /// Abort the active countdown, if any.
    pub async fn cancel_countdown(&self) {
        self.countdown.lock().await.cancel();
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }

    /// Plan a transition to the shared game state machine, returning the plan.
    async fn plan_transition(&self, event: GameEvent) -> Result<Plan, PlanError> {
        let mut sm = self.game.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition to the shared game state machine, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<GamePhase, ApplyError> {
        let mut sm = self.game.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition of the shared game state machine
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.game.write().await;
        sm.abort(plan_id)
    }

    /// Snapshot the state machine, including any pending transition.
    pub async fn snapshot(&self) -> Snapshot {
        let sm = self.game.read().await;
        sm.snapshot()
    }

    /// Run a planned transition around the given side-effect work.
    ///
    /// The plan is validated first; the work runs while the plan is pending
    /// and the transition is applied only when the work succeeds. Work errors
    /// and timeouts abort the plan, leaving the phase untouched.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: GameEvent,
        work: F,
    ) -> Result<(T, GamePhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}
