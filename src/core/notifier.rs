//! Pipeline status notifications.
//!
//! One event in, one chat line out: `Pipeline {name} has {state}`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use super::Handler;
use crate::adapters::{deliver, ChatSink};
use crate::config::SlackConfig;
use crate::domain::{ChatMessage, HandlerResponse, StatusEvent};

/// Body returned by the status handlers
pub const EVENT_PROCESSED: &str = "Event processed successfully";

/// Posts a one-line status message for every pipeline state change
pub struct PipelineNotifier {
    slack: SlackConfig,
    sink: Arc<dyn ChatSink>,
}

impl PipelineNotifier {
    pub fn new(slack: SlackConfig, sink: Arc<dyn ChatSink>) -> Self {
        Self { slack, sink }
    }

    /// Build the status message for an event
    pub fn status_message(&self, event: &StatusEvent) -> ChatMessage {
        ChatMessage::text(&self.slack.channel, &self.slack.username, event.status_text())
    }

    /// Send the status message. Delivery failures are logged only.
    pub async fn notify(&self, event: &StatusEvent) -> bool {
        deliver(self.sink.as_ref(), &self.status_message(event)).await
    }
}

#[async_trait]
impl Handler for PipelineNotifier {
    fn name(&self) -> &str {
        "notifier"
    }

    #[instrument(skip(self, event))]
    async fn handle(&self, event: Value) -> HandlerResponse {
        info!("Event: {}", event);

        let status = StatusEvent::from_value(&event);
        self.notify(&status).await;

        HandlerResponse::ok(EVENT_PROCESSED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fakes::RecordingChatSink;
    use crate::adapters::DeliveryError;
    use serde_json::json;

    fn slack() -> SlackConfig {
        SlackConfig {
            webhook_url: "http://unused".to_string(),
            channel: "#code-lambda-alerts".to_string(),
            username: "sample-user".to_string(),
        }
    }

    #[tokio::test]
    async fn test_posts_lowercased_state() {
        let sink = Arc::new(RecordingChatSink::new());
        let notifier = PipelineNotifier::new(slack(), sink.clone());

        let resp = notifier
            .handle(json!({ "detail": { "pipeline": "WebApp-Prod", "state": "Succeeded" } }))
            .await;

        assert_eq!(resp, HandlerResponse::ok(EVENT_PROCESSED));
        assert_eq!(
            sink.messages(),
            vec![ChatMessage::text(
                "#code-lambda-alerts",
                "sample-user",
                "Pipeline WebApp-Prod has succeeded"
            )]
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_still_succeeds() {
        let sink = Arc::new(RecordingChatSink::failing(DeliveryError::Transport(
            "connection refused".to_string(),
        )));
        let notifier = PipelineNotifier::new(slack(), sink.clone());

        let resp = notifier
            .handle(json!({ "detail": { "pipeline": "p", "state": "FAILED" } }))
            .await;

        assert_eq!(resp.status_code, 200);
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test]
    async fn test_mistyped_state_keeps_pipeline_name() {
        let sink = Arc::new(RecordingChatSink::new());
        let notifier = PipelineNotifier::new(slack(), sink.clone());

        let resp = notifier
            .handle(json!({ "detail": { "pipeline": "WebApp", "state": null } }))
            .await;

        assert_eq!(resp.status_code, 200);
        assert_eq!(sink.messages()[0].text.as_deref(), Some("Pipeline WebApp has "));
    }
}
