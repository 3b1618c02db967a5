//! Slack incoming-webhook client.
//!
//! Endpoint: POST <webhook url>
//! Body: the `ChatMessage` as JSON

use async_trait::async_trait;

use super::{ChatSink, DeliveryError};
use crate::config::SlackConfig;
use crate::domain::ChatMessage;

/// Slack webhook client
pub struct SlackWebhook {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackWebhook {
    /// Create a new client
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from config
    pub fn from_config(config: &SlackConfig) -> Self {
        Self::new(config.webhook_url.clone())
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }
}

#[async_trait]
impl ChatSink for SlackWebhook {
    async fn post(&self, message: &ChatMessage) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .json(message)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            // Drain the body so the connection can be reused
            let _ = response.bytes().await;
            Ok(())
        } else {
            Err(DeliveryError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            })
        }
    }
}
