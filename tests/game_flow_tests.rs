//! End-to-end gameplay flows driven through the service layer with a stub
//! question source and a temp-dir file store.

use std::{path::PathBuf, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

use millionaire_back::{
    config::{AppConfig, GameRules, Pacing},
    dao::snapshot_store::{SnapshotStore, file::FileSnapshotStore},
    dto::{
        game::{ActionStatus, AnswerRequest, StartGameRequest, WalkAwayRequest},
        sse::ServerEvent,
    },
    services::{game_service, lifeline_service, public_service},
    state::{
        AppState, SharedState,
        state_machine::{GamePhase, GameRunningPhase, Outcome},
    },
    trivia::{Category, Difficulty, FetchError, FetchResult, Question, QuestionSource},
};

struct StubQuestionSource {
    questions: Vec<Question>,
}

impl QuestionSource for StubQuestionSource {
    fn fetch_questions(
        &self,
        _difficulty: Difficulty,
        _category: Option<u32>,
        amount: usize,
    ) -> BoxFuture<'static, FetchResult<Vec<Question>>> {
        let questions = self.questions.clone();
        Box::pin(async move {
            if questions.len() < amount {
                return Err(FetchError::ShortResults {
                    expected: amount,
                    got: questions.len(),
                });
            }
            Ok(questions.into_iter().take(amount).collect())
        })
    }

    fn fetch_categories(&self) -> BoxFuture<'static, FetchResult<Vec<Category>>> {
        Box::pin(async move {
            Ok(vec![Category {
                id: 9,
                name: "General Knowledge".into(),
            }])
        })
    }
}

struct FailingQuestionSource;

impl QuestionSource for FailingQuestionSource {
    fn fetch_questions(
        &self,
        _difficulty: Difficulty,
        _category: Option<u32>,
        amount: usize,
    ) -> BoxFuture<'static, FetchResult<Vec<Question>>> {
        Box::pin(async move {
            Err(FetchError::ShortResults {
                expected: amount,
                got: 0,
            })
        })
    }

    fn fetch_categories(&self) -> BoxFuture<'static, FetchResult<Vec<Category>>> {
        Box::pin(async move {
            Err(FetchError::ShortResults {
                expected: 1,
                got: 0,
            })
        })
    }
}

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

fn fast_config() -> AppConfig {
    AppConfig::new(
        GameRules::default(),
        Pacing {
            answer_select: Duration::ZERO,
            answer_reveal: Duration::ZERO,
            phone_ringing: Duration::ZERO,
            phone_message: Duration::ZERO,
        },
    )
}

fn temp_store_path() -> PathBuf {
    std::env::temp_dir()
        .join("millionaire-back-tests")
        .join(format!("{}.json", Uuid::new_v4()))
}

async fn open_store(path: &PathBuf) -> Arc<dyn SnapshotStore> {
    Arc::new(FileSnapshotStore::open(path.clone()).await.unwrap())
}

async fn new_state(store_path: &PathBuf) -> SharedState {
    let state = AppState::new(
        fast_config(),
        Arc::new(StubQuestionSource {
            questions: sample_questions(15),
        }),
        None,
    );
    state.install_snapshot_store(open_store(store_path).await).await;
    state
}

async fn start(state: &SharedState) {
    game_service::start_game(
        state,
        StartGameRequest {
            difficulty: Difficulty::Easy,
            category: None,
        },
    )
    .await
    .unwrap();
}

async fn current_correct_answer(state: &SharedState) -> String {
    state
        .read_current_game(|maybe| {
            maybe
                .and_then(|session| session.current_question())
                .map(|question| question.correct_answer.clone())
                .expect("an active question")
        })
        .await
}

async fn current_index(state: &SharedState) -> usize {
    state
        .read_current_game(|maybe| maybe.map(|session| session.current_question_index).unwrap())
        .await
}

fn drain_events(receiver: &mut broadcast::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}

async fn answer_correctly(state: &SharedState) -> ActionStatus {
    let answer = current_correct_answer(state).await;
    game_service::handle_answer(
        state,
        AnswerRequest {
            answer: Some(answer),
            option: None,
        },
    )
    .await
    .unwrap()
    .status
}

#[tokio::test(start_paused = true)]
async fn winning_all_fifteen_questions_pays_the_top_prize() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    for step in 0..15 {
        assert_eq!(current_index(&state).await, step);
        assert_eq!(answer_correctly(&state).await, ActionStatus::Applied);

        if matches!(
            state.state_machine_phase().await,
            GamePhase::GameRunning(GameRunningPhase::SafeHavenPrompt)
        ) {
            let declined = game_service::walk_away(&state, WalkAwayRequest { confirmed: false })
                .await
                .unwrap();
            assert_eq!(declined.status, ActionStatus::Applied);
        }
    }

    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameOver(Outcome::Won)
    );

    let view = public_service::game_view(&state).await;
    assert_eq!(view.prize, Some(1_000_000));

    // Terminal resolution clears the persisted snapshot.
    let store = open_store(&store_path).await;
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn losing_the_first_question_pays_nothing() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    let response = game_service::handle_answer(
        &state,
        AnswerRequest {
            answer: Some("definitely wrong".into()),
            option: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.status, ActionStatus::Applied);

    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameOver(Outcome::Lost)
    );

    let view = public_service::game_view(&state).await;
    assert_eq!(view.prize, Some(0));

    let store = open_store(&store_path).await;
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn walking_away_at_the_first_haven_locks_in_its_prize() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    for _ in 0..5 {
        assert_eq!(answer_correctly(&state).await, ActionStatus::Applied);
    }

    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::SafeHavenPrompt)
    );
    assert_eq!(current_index(&state).await, 5);

    let response = game_service::walk_away(&state, WalkAwayRequest { confirmed: true })
        .await
        .unwrap();
    assert_eq!(response.status, ActionStatus::Applied);

    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameOver(Outcome::WalkedAway)
    );

    let view = public_service::game_view(&state).await;
    assert_eq!(view.prize, Some(1_000));

    let store = open_store(&store_path).await;
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_loses_with_the_times_up_banner() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;

    let mut events = state.public_sse().subscribe();
    start(&state).await;

    // Let the 30-second countdown run out.
    tokio::time::sleep(Duration::from_secs(35)).await;

    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameOver(Outcome::Lost)
    );

    let mut saw_times_up = false;
    for event in drain_events(&mut events) {
        if event.event.as_deref() == Some("game.over") {
            let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
            assert_eq!(payload["message"], "Time's up!");
            assert_eq!(payload["prize"], 0);
            saw_times_up = true;
        }
    }
    assert!(saw_times_up, "expected a game.over broadcast");

    let store = open_store(&store_path).await;
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn starting_twice_keeps_the_running_session() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    let first_id = state
        .read_current_game(|maybe| maybe.map(|session| session.id).unwrap())
        .await;
    assert_eq!(answer_correctly(&state).await, ActionStatus::Applied);

    // A second start while the game runs must not touch the session.
    start(&state).await;

    let second_id = state
        .read_current_game(|maybe| maybe.map(|session| session.id).unwrap())
        .await;
    assert_eq!(first_id, second_id);
    assert_eq!(current_index(&state).await, 1);
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_rolls_the_start_back() {
    let state = AppState::new(fast_config(), Arc::new(FailingQuestionSource), None);
    let store_path = temp_store_path();
    state.install_snapshot_store(open_store(&store_path).await).await;

    let result = game_service::start_game(
        &state,
        StartGameRequest {
            difficulty: Difficulty::Hard,
            category: None,
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(state.state_machine_phase().await, GamePhase::Idle);
    assert!(state.read_current_game(|maybe| maybe.is_none()).await);

    let store = open_store(&store_path).await;
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn resume_restores_progress_and_lifelines() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    assert_eq!(
        lifeline_service::use_fifty_fifty(&state).await.unwrap().status,
        ActionStatus::Applied
    );
    assert_eq!(answer_correctly(&state).await, ActionStatus::Applied);
    assert_eq!(answer_correctly(&state).await, ActionStatus::Applied);
    state.cancel_countdown().await;

    // A fresh process adopts the snapshot where the last one left off.
    let resumed = new_state(&store_path).await;
    game_service::resume_game(&resumed).await.unwrap();

    assert_eq!(
        resumed.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::Question)
    );
    assert_eq!(current_index(&resumed).await, 2);

    resumed
        .read_current_game(|maybe| {
            let session = maybe.unwrap();
            assert!(session.started);
            assert!(session.lifelines_used.fifty_fifty);
            assert!(!session.lifelines_used.phone_friend);
            // Resume reshuffles the full answer set for the stored question.
            assert_eq!(session.displayed_answers.len(), 4);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn resume_rejects_and_clears_stale_snapshots() {
    let store_path = temp_store_path();
    let store = open_store(&store_path).await;

    // A snapshot whose game already ended is not resumable.
    let mut stale = millionaire_back::dao::models::GameSnapshotEntity {
        started: false,
        ..serde_json::from_str("{}").unwrap()
    };
    stale.questions = sample_questions(15).into_iter().map(Into::into).collect();
    store.save(stale.clone()).await.unwrap();

    let state = new_state(&store_path).await;
    assert!(game_service::resume_game(&state).await.is_err());
    assert_eq!(state.state_machine_phase().await, GamePhase::Idle);
    assert!(store.load().await.unwrap().is_none());

    // A snapshot pointing past the last question is not resumable either.
    stale.started = true;
    stale.current_question_index = 15;
    store.save(stale).await.unwrap();

    assert!(game_service::resume_game(&state).await.is_err());
    assert!(store.load().await.unwrap().is_none());

    // An empty store has nothing to resume.
    assert!(game_service::resume_game(&state).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn fifty_fifty_trims_to_two_answers_once() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    let response = lifeline_service::use_fifty_fifty(&state).await.unwrap();
    assert_eq!(response.status, ActionStatus::Applied);

    let (answers, correct) = state
        .read_current_game(|maybe| {
            let session = maybe.unwrap();
            (
                session.displayed_answers.clone(),
                session.current_question().unwrap().correct_answer.clone(),
            )
        })
        .await;
    assert_eq!(answers.len(), 2);
    assert!(answers.values().any(|answer| *answer == correct));

    // The second invocation is a no-op that leaves the answers alone.
    let repeat = lifeline_service::use_fifty_fifty(&state).await.unwrap();
    assert_eq!(repeat.status, ActionStatus::Ignored);

    let unchanged = state
        .read_current_game(|maybe| maybe.map(|session| session.displayed_answers.clone()).unwrap())
        .await;
    assert_eq!(unchanged, answers);
}

#[tokio::test(start_paused = true)]
async fn audience_votes_sum_to_one_hundred_over_the_wire() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    let mut events = state.public_sse().subscribe();
    let response = lifeline_service::use_ask_audience(&state).await.unwrap();
    assert_eq!(response.status, ActionStatus::Applied);

    let mut total = 0u64;
    let mut seen = false;
    for event in drain_events(&mut events) {
        if event.event.as_deref() == Some("lifeline.ask_audience") {
            let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
            for vote in payload["votes"].as_array().unwrap() {
                total += vote["percent"].as_u64().unwrap();
            }
            seen = true;
        }
    }
    assert!(seen, "expected an audience broadcast");
    assert_eq!(total, 100);
}

#[tokio::test(start_paused = true)]
async fn phone_friend_is_advisory_and_single_use() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    let before = state
        .read_current_game(|maybe| maybe.map(|session| session.displayed_answers.clone()).unwrap())
        .await;

    let mut events = state.public_sse().subscribe();
    let response = lifeline_service::use_phone_friend(&state).await.unwrap();
    assert_eq!(response.status, ActionStatus::Applied);

    let mut suggestion = None;
    for event in drain_events(&mut events) {
        if event.event.as_deref() == Some("lifeline.phone_friend") {
            let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
            suggestion = payload["suggestion"].as_str().map(str::to_string);
        }
    }
    let suggestion = suggestion.expect("expected a phone friend broadcast");
    assert!(before.values().any(|answer| *answer == suggestion));

    // The answer buttons are untouched by the advisory call.
    let after = state
        .read_current_game(|maybe| maybe.map(|session| session.displayed_answers.clone()).unwrap())
        .await;
    assert_eq!(before, after);

    let repeat = lifeline_service::use_phone_friend(&state).await.unwrap();
    assert_eq!(repeat.status, ActionStatus::Ignored);
}

#[tokio::test(start_paused = true)]
async fn answers_by_option_label_follow_the_displayed_order() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    let correct_label = state
        .read_current_game(|maybe| {
            let session = maybe.unwrap();
            let correct = session.current_question().unwrap().correct_answer.clone();
            session
                .displayed_answers
                .iter()
                .find(|(_, answer)| **answer == correct)
                .map(|(label, _)| label.clone())
                .unwrap()
        })
        .await;

    let response = game_service::handle_answer(
        &state,
        AnswerRequest {
            answer: None,
            option: Some(correct_label.to_lowercase()),
        },
    )
    .await
    .unwrap();

    assert_eq!(response.status, ActionStatus::Applied);
    assert_eq!(current_index(&state).await, 1);
}

#[tokio::test(start_paused = true)]
async fn commands_outside_their_phase_are_ignored() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;

    // No game yet: every gameplay command no-ops.
    let response = game_service::handle_answer(
        &state,
        AnswerRequest {
            answer: Some("anything".into()),
            option: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.status, ActionStatus::Ignored);

    let response = game_service::walk_away(&state, WalkAwayRequest { confirmed: true })
        .await
        .unwrap();
    assert_eq!(response.status, ActionStatus::Ignored);

    assert_eq!(
        lifeline_service::use_fifty_fifty(&state).await.unwrap().status,
        ActionStatus::Ignored
    );

    // After a loss the same commands stay inert.
    start(&state).await;
    game_service::handle_answer(
        &state,
        AnswerRequest {
            answer: Some("definitely wrong".into()),
            option: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameOver(Outcome::Lost)
    );

    let response = game_service::handle_answer(
        &state,
        AnswerRequest {
            answer: Some("Right 1".into()),
            option: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.status, ActionStatus::Ignored);
    assert_eq!(
        lifeline_service::use_ask_audience(&state).await.unwrap().status,
        ActionStatus::Ignored
    );
}

#[tokio::test(start_paused = true)]
async fn walking_away_is_only_offered_at_safe_havens() {
    let store_path = temp_store_path();
    let state = new_state(&store_path).await;
    start(&state).await;

    // Question 1 is not a haven; the offer is closed.
    let response = game_service::walk_away(&state, WalkAwayRequest { confirmed: true })
        .await
        .unwrap();
    assert_eq!(response.status, ActionStatus::Ignored);
    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::Question)
    );

    for _ in 0..4 {
        assert_eq!(answer_correctly(&state).await, ActionStatus::Applied);
    }
    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::Question)
    );

    // The fifth correct answer opens the prompt before question 6 is shown.
    assert_eq!(answer_correctly(&state).await, ActionStatus::Applied);
    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::SafeHavenPrompt)
    );

    // Declining moves on to question 6.
    game_service::walk_away(&state, WalkAwayRequest { confirmed: false })
        .await
        .unwrap();
    assert_eq!(
        state.state_machine_phase().await,
        GamePhase::GameRunning(GameRunningPhase::Question)
    );
    assert_eq!(current_index(&state).await, 5);
}
