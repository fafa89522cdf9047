//! Alert notification channels
//!
//! The engine only needs "deliver this text to that chat". Delivery failures
//! are reported to the caller, which logs them and carries on.

use crate::domain::OperatorId;
use crate::error::NotifyError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Bot API endpoint
pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Notification channel trait
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `text` to the chat `destination`
    async fn deliver(&self, destination: OperatorId, text: &str) -> Result<(), NotifyError>;

    /// Channel name for identification
    fn name(&self) -> &str;
}

/// Notifier writing messages to the log
///
/// Used when no bot token is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, destination: OperatorId, text: &str) -> Result<(), NotifyError> {
        log::warn!("[chat {}] {}", destination, text);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Notifier posting through the Telegram Bot API
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    /// Create a notifier for a bot token
    pub fn new(token: &str) -> Result<Self, NotifyError> {
        Self::with_base_url(TELEGRAM_API, token)
    }

    /// Create a notifier against another API host
    pub fn with_base_url(base_url: &str, token: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", base_url.trim_end_matches('/'), token),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, destination: OperatorId, text: &str) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "chat_id": destination,
            "text": text,
            "disable_web_page_preview": true,
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        let reply: Option<ApiReply> = response.json().await.ok();

        match reply {
            Some(reply) if status.is_success() && reply.ok => Ok(()),
            Some(reply) => Err(NotifyError::Rejected {
                channel: self.name().to_string(),
                reason: reply
                    .description
                    .unwrap_or_else(|| status.to_string()),
            }),
            None => Err(NotifyError::Rejected {
                channel: self.name().to_string(),
                reason: status.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
