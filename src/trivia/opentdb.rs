//! Open Trivia DB (<https://opentdb.com>) question source client.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;

use super::{Category, Difficulty, FetchError, FetchResult, Question, QuestionSource};

/// Default API endpoint, overridable for tests and mirrors.
const DEFAULT_BASE_URL: &str = "https://opentdb.com";
/// Environment variable that overrides [`DEFAULT_BASE_URL`].
const BASE_URL_ENV: &str = "TRIVIA_API_BASE_URL";

/// HTTP client for the Open Trivia DB API.
#[derive(Clone)]
pub struct OpenTdbClient {
    client: Client,
    base_url: Arc<str>,
}

impl OpenTdbClient {
    /// Build a client against the given API base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
        })
    }

    /// Build a client from the environment, defaulting to the public API.
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }
}

/// Envelope returned by the `api.php` question endpoint.
#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    response_code: u8,
    #[serde(default)]
    results: Vec<QuestionPayload>,
}

/// One question as delivered by the API.
#[derive(Debug, Deserialize)]
struct QuestionPayload {
    question: String,
    correct_answer: String,
    incorrect_answers: Vec<String>,
}

/// Envelope returned by the `api_category.php` endpoint.
#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    trivia_categories: Vec<Category>,
}

impl From<QuestionPayload> for Question {
    fn from(value: QuestionPayload) -> Self {
        Self {
            text: value.question,
            correct_answer: value.correct_answer,
            incorrect_answers: value.incorrect_answers,
        }
    }
}

impl QuestionSource for OpenTdbClient {
    fn fetch_questions(
        &self,
        difficulty: Difficulty,
        category: Option<u32>,
        amount: usize,
    ) -> BoxFuture<'static, FetchResult<Vec<Question>>> {
        let client = self.client.clone();
        let url = format!("{}/api.php", self.base_url);

        Box::pin(async move {
            let mut query: Vec<(&str, String)> = vec![
                ("amount", amount.to_string()),
                ("difficulty", difficulty.as_str().to_string()),
                ("type", "multiple".to_string()),
            ];
            if let Some(category) = category {
                query.push(("category", category.to_string()));
            }

            let response = client
                .get(url)
                .query(&query)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|source| FetchError::Transport { source })?;

            let payload = response
                .json::<QuestionsResponse>()
                .await
                .map_err(|source| FetchError::Decode { source })?;

            if payload.response_code != 0 {
                return Err(FetchError::ResponseCode {
                    code: payload.response_code,
                });
            }

            if payload.results.len() != amount {
                return Err(FetchError::ShortResults {
                    expected: amount,
                    got: payload.results.len(),
                });
            }

            Ok(payload.results.into_iter().map(Into::into).collect())
        })
    }

    fn fetch_categories(&self) -> BoxFuture<'static, FetchResult<Vec<Category>>> {
        let client = self.client.clone();
        let url = format!("{}/api_category.php", self.base_url);

        Box::pin(async move {
            let response = client
                .get(url)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|source| FetchError::Transport { source })?;

            let payload = response
                .json::<CategoriesResponse>()
                .await
                .map_err(|source| FetchError::Decode { source })?;

            Ok(payload.trivia_categories)
        })
    }
}
