//! Best-effort completion webhook invoked at terminal prize resolution.

use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

/// Environment variable carrying the webhook URL; absent means no channel.
const WEBHOOK_URL_ENV: &str = "NOTIFY_WEBHOOK_URL";

/// Notification payload POSTed to the host platform.
#[derive(Debug, Serialize)]
struct CompletionMessage {
    message: String,
    prize: u64,
}

/// Client for the optional host-platform completion webhook.
///
/// Failures are logged and swallowed; the player never sees them.
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    webhook_url: Arc<str>,
}

impl Notifier {
    /// Build a notifier targeting the given webhook URL.
    pub fn new(webhook_url: impl AsRef<str>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            webhook_url: Arc::from(webhook_url.as_ref()),
        })
    }

    /// Build a notifier from the environment; `None` when no channel is registered.
    pub fn from_env() -> Result<Option<Self>, reqwest::Error> {
        match std::env::var(WEBHOOK_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url).map(Some),
            _ => Ok(None),
        }
    }

    /// POST the final prize to the webhook, logging any failure.
    pub async fn notify(&self, prize: u64) {
        let payload = CompletionMessage {
            message: format!("you won ${prize}"),
            prize,
        };

        match self
            .client
            .post(self.webhook_url.as_ref())
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status())
        {
            Ok(_) => debug!(prize, "completion notification delivered"),
            Err(err) => warn!(error = %err, "completion notification failed"),
        }
    }
}
