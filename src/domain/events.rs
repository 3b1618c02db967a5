//! Inbound event types.
//!
//! Events are transient: each one is built from a single invocation payload
//! and consumed once by the handler that received it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A pipeline state-change event, reduced to the two fields the handlers use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Pipeline name (`detail.pipeline`)
    pub pipeline: String,

    /// Raw state value (`detail.state`), e.g. `SUCCEEDED`
    pub state: String,
}

impl StatusEvent {
    /// Create a status event directly
    pub fn new(pipeline: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            state: state.into(),
        }
    }

    /// Extract `detail.pipeline` and `detail.state` from a raw event.
    ///
    /// Each field is read on its own: a missing or non-string value becomes
    /// an empty string without affecting the other field.
    pub fn from_value(event: &Value) -> Self {
        let field = |name: &str| {
            event
                .get("detail")
                .and_then(|detail| detail.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            pipeline: field("pipeline"),
            state: field("state"),
        }
    }

    /// The one-line status text, e.g. `Pipeline deploy has succeeded`
    pub fn status_text(&self) -> String {
        format!("Pipeline {} has {}", self.pipeline, self.state.to_lowercase())
    }

    /// Whether the state is SUCCEEDED or FAILED (case-insensitive)
    pub fn is_terminal(&self) -> bool {
        self.state.eq_ignore_ascii_case("succeeded") || self.state.eq_ignore_ascii_case("failed")
    }
}

/// Opaque build identifier of the form `<service>:<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(String);

impl BuildId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log stream name: everything after the first `:`, if there is one.
    pub fn log_stream(&self) -> Option<&str> {
        self.0.split_once(':').map(|(_, stream)| stream)
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Log subscription envelope: `{ "awslogs": { "data": "<base64>" } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEnvelope {
    pub awslogs: AwsLogs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsLogs {
    /// base64(gzip(JSON)) payload
    pub data: String,
}

/// Decompressed subscription document.
///
/// Only `log_events` drives behavior; the remaining fields are kept for
/// logging and are never required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogsData {
    pub message_type: Option<String>,
    pub owner: Option<String>,
    pub log_group: Option<String>,
    pub log_stream: Option<String>,
    pub subscription_filters: Vec<String>,

    /// `None` when `logEvents` is absent or not an array
    pub log_events: Option<Vec<LogRecord>>,
}

/// A single log record inside a subscription batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Milliseconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    pub message: String,
}

impl LogRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: None,
            message: message.into(),
        }
    }
}
