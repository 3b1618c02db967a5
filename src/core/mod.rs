//! Event handlers.
//!
//! This module contains:
//! - Notifier: One-line pipeline status messages
//! - BuildLogs: Status message plus an uploaded build log link
//! - Subscription: Aggregated CloudWatch Logs subscription batches
//! - Decode/Extract: Payload decoding and build id extraction

pub mod build_logs;
pub mod decode;
pub mod extract;
pub mod notifier;
pub mod subscription;

use async_trait::async_trait;

use crate::domain::HandlerResponse;

// Re-export commonly used types
pub use build_logs::{BuildLogRelay, EnrichmentError};
pub use decode::{aggregate_messages, decode_payload, DecodeError, NO_LOG_EVENTS};
pub use extract::extract_build_id;
pub use notifier::PipelineNotifier;
pub use subscription::LogSubscriptionAggregator;

/// A stateless per-event handler
#[async_trait]
pub trait Handler: Send + Sync {
    /// Human-readable handler name
    fn name(&self) -> &str;

    /// Process one event. Never fails: errors become the response.
    async fn handle(&self, event: serde_json::Value) -> HandlerResponse;
}
