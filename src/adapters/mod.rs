//! Adapter interfaces for external systems.
//!
//! Handlers talk to the outside world only through these traits:
//! - `ChatSink`: delivers a chat message (Slack incoming webhook)
//! - `BuildService`: lists builds for a project (CodeBuild)
//! - `LogService`: reads a log stream (CloudWatch Logs)
//! - `ObjectStore`: uploads files and signs download URLs (S3)
//!
//! Every call returns an explicit `Result` so callers decide what a failure
//! means for their control flow.

pub mod aws;
pub mod fakes;
pub mod slack;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::ChatMessage;

pub use aws::{AwsServices, CloudWatchLogService, CodeBuildService, S3ObjectStore};
pub use slack::SlackWebhook;

/// Failure to deliver a chat message
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The webhook answered with a non-2xx status
    #[error("Request failed: {code} {reason}")]
    Status { code: u16, reason: String },

    /// The request never got a response
    #[error("Server connection failed: {0}")]
    Transport(String),
}

/// Failure of a build, log or storage service call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Build query failed: {0}")]
    BuildQuery(String),

    #[error("Log query failed: {0}")]
    LogQuery(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Credentials not available: {0}")]
    Credentials(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Presign failed: {0}")]
    Presign(String),
}

/// Destination for chat messages
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn post(&self, message: &ChatMessage) -> Result<(), DeliveryError>;
}

/// Build history lookup
#[async_trait]
pub trait BuildService: Send + Sync {
    /// Build identifiers for `project`, most recent first
    async fn latest_build_ids(&self, project: &str) -> Result<Vec<String>, ServiceError>;
}

/// Log stream reader
#[async_trait]
pub trait LogService: Send + Sync {
    /// Every message in the stream, oldest first
    async fn fetch_messages(&self, group: &str, stream: &str) -> Result<Vec<String>, ServiceError>;
}

/// Object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &Path, bucket: &str, key: &str) -> Result<(), ServiceError>;

    /// Time-limited GET URL for `bucket/key`
    async fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, ServiceError>;
}

/// Post a message and log the outcome.
///
/// Delivery is best-effort: failures are logged and never propagated.
/// Returns whether the webhook accepted the message.
pub async fn deliver(sink: &dyn ChatSink, message: &ChatMessage) -> bool {
    match sink.post(message).await {
        Ok(()) => {
            info!("Message posted to {}", message.channel);
            true
        }
        Err(e) => {
            error!(channel = %message.channel, "{}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fakes::RecordingChatSink;

    #[tokio::test]
    async fn test_deliver_records_message() {
        let sink = RecordingChatSink::new();
        let msg = ChatMessage::text("#c", "u", "hello");

        assert!(deliver(&sink, &msg).await);
        assert_eq!(sink.messages(), vec![msg]);
    }

    #[tokio::test]
    async fn test_deliver_swallows_failure() {
        let sink = RecordingChatSink::failing(DeliveryError::Status {
            code: 404,
            reason: "Not Found".to_string(),
        });

        assert!(!deliver(&sink, &ChatMessage::text("#c", "u", "hello")).await);
        assert_eq!(sink.attempts(), 1);
    }

    #[test]
    fn test_delivery_error_messages() {
        let status = DeliveryError::Status {
            code: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(status.to_string(), "Request failed: 500 Internal Server Error");
        assert_eq!(
            DeliveryError::Transport("connection refused".to_string()).to_string(),
            "Server connection failed: connection refused"
        );
    }
}
