//! CloudWatch Logs subscription aggregator.
//!
//! Decodes a batched subscription payload, joins its messages, and posts them
//! as one structured chat message tagged with the first build id found.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, field, info, instrument, Span};

use super::decode::{aggregate_messages, decode_payload, DecodeError};
use super::extract::extract_build_id;
use super::Handler;
use crate::adapters::{deliver, ChatSink};
use crate::config::{SlackConfig, SubscriptionConfig};
use crate::domain::{Block, ChatMessage, HandlerResponse, TextObject};

pub const HEADER_TEXT: &str = "Aggregated Log Messages";
pub const FOOTER_TEXT: &str = "Logs were aggregated and sent by AWS Lambda.";

/// Aggregates each subscription batch into a single chat message
pub struct LogSubscriptionAggregator {
    slack: SlackConfig,
    settings: SubscriptionConfig,
    sink: Arc<dyn ChatSink>,
}

impl LogSubscriptionAggregator {
    pub fn new(slack: SlackConfig, settings: SubscriptionConfig, sink: Arc<dyn ChatSink>) -> Self {
        Self {
            slack,
            settings,
            sink,
        }
    }

    /// Header, summary section, divider and footer
    pub fn summary_message(&self, build_id: &str, aggregated: &str) -> ChatMessage {
        ChatMessage::blocks(
            &self.slack.channel,
            &self.slack.username,
            vec![
                Block::Header {
                    text: TextObject::plain(HEADER_TEXT),
                },
                Block::Section {
                    text: TextObject::markdown(format!(
                        "*CodeBuild ID:* {}\n*Log Summary:*\n{}",
                        build_id, aggregated
                    )),
                },
                Block::Divider,
                Block::Context {
                    elements: vec![TextObject::markdown(FOOTER_TEXT)],
                },
            ],
        )
    }

    /// Decode, aggregate and post. Only decoding can fail.
    async fn process(&self, event: &Value) -> Result<(), DecodeError> {
        let data = decode_payload(event)?;

        let span = Span::current();
        if let Some(group) = &data.log_group {
            span.record("log_group", group.as_str());
        }
        if let Some(stream) = &data.log_stream {
            span.record("log_stream", stream.as_str());
        }

        let aggregated = aggregate_messages(&data);
        let build_id = extract_build_id(&aggregated, &self.settings.default_build_id);
        info!(%build_id, "Aggregated Log Messages:\n{}", aggregated);

        deliver(self.sink.as_ref(), &self.summary_message(&build_id, &aggregated)).await;
        Ok(())
    }
}

#[async_trait]
impl Handler for LogSubscriptionAggregator {
    fn name(&self) -> &str {
        "log-subscription"
    }

    #[instrument(skip(self, event), fields(log_group = field::Empty, log_stream = field::Empty))]
    async fn handle(&self, event: Value) -> HandlerResponse {
        info!("Event: {}", event);

        match self.process(&event).await {
            Ok(()) => HandlerResponse::ok("Success"),
            Err(e) => {
                error!("Error: {}", e);
                HandlerResponse::error("Error occurred")
            }
        }
    }
}
