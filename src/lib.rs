//! pipeline-relay - Slack notifications for pipeline and log events
//!
//! Three independent, stateless handlers, each invoked once per event:
//!
//! - `PipelineNotifier`: posts `Pipeline {name} has {state}`
//! - `BuildLogRelay`: same status line, then on terminal states uploads the
//!   latest build's log to S3 and posts a presigned download link
//! - `LogSubscriptionAggregator`: decodes a CloudWatch Logs subscription
//!   batch and posts the joined messages as one structured message
//!
//! Chat delivery is best-effort: failures are logged, never retried and
//! never surfaced to the event source.
//!
//! # Modules
//!
//! - `adapters`: External systems (Slack webhook, CodeBuild, CloudWatch Logs, S3)
//! - `core`: The handlers and payload decoding
//! - `domain`: Data structures (StatusEvent, ChatMessage, HandlerResponse)
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run under the Lambda runtime
//! pipeline-relay serve --handler log-subscription
//!
//! # Try a handler locally
//! pipeline-relay invoke --handler notifier --event event.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use config::RelayConfig;
pub use crate::core::{BuildLogRelay, Handler, LogSubscriptionAggregator, PipelineNotifier};
pub use domain::{ChatMessage, HandlerResponse, StatusEvent};
