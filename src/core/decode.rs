//! Log subscription payload decoding.
//!
//! `awslogs.data` is base64(gzip(JSON)). Decoding happens in that order and
//! any failure is a malformed-input error.

use std::io::Read;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{LogRecord, LogsData, SubscriptionEnvelope};

/// Aggregated text used when the batch carries no `logEvents` array
pub const NO_LOG_EVENTS: &str = "No log events found.";

/// Malformed subscription payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Event is not a log subscription envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid gzip payload: {0}")]
    Gzip(#[source] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Log event {index} has no string message")]
    Record { index: usize },
}

/// Decode a raw subscription event into its log batch
pub fn decode_payload(event: &Value) -> Result<LogsData, DecodeError> {
    let envelope = SubscriptionEnvelope::deserialize(event).map_err(DecodeError::Envelope)?;

    // Line breaks inside the base64 text are not part of the payload
    let data: String = envelope
        .awslogs
        .data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let compressed = STANDARD.decode(data.as_bytes())?;

    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(DecodeError::Gzip)?;

    let document: Value = serde_json::from_slice(&json).map_err(DecodeError::Json)?;
    parse_logs_data(&document)
}

fn parse_logs_data(document: &Value) -> Result<LogsData, DecodeError> {
    let text = |key: &str| document.get(key).and_then(Value::as_str).map(str::to_string);

    let log_events = match document.get("logEvents") {
        Some(Value::Array(events)) => Some(
            events
                .iter()
                .enumerate()
                .map(|(index, event)| parse_record(index, event))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => None,
    };

    Ok(LogsData {
        message_type: text("messageType"),
        owner: text("owner"),
        log_group: text("logGroup"),
        log_stream: text("logStream"),
        subscription_filters: document
            .get("subscriptionFilters")
            .and_then(Value::as_array)
            .map(|filters| {
                filters
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        log_events,
    })
}

fn parse_record(index: usize, event: &Value) -> Result<LogRecord, DecodeError> {
    let message = event
        .get("message")
        .and_then(Value::as_str)
        .ok_or(DecodeError::Record { index })?;

    Ok(LogRecord {
        id: event.get("id").and_then(Value::as_str).map(str::to_string),
        timestamp: event.get("timestamp").and_then(Value::as_i64),
        message: message.to_string(),
    })
}

/// Join every message with `\n`, in order.
///
/// A batch without a `logEvents` array (or with an empty one) yields
/// [`NO_LOG_EVENTS`].
pub fn aggregate_messages(data: &LogsData) -> String {
    match &data.log_events {
        Some(events) if !events.is_empty() => events
            .iter()
            .map(|event| event.message.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => NO_LOG_EVENTS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    fn envelope_for(document: &Value) -> Value {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(document.to_string().as_bytes())
            .unwrap();
        let compressed = encoder.finish().unwrap();
        json!({ "awslogs": { "data": STANDARD.encode(compressed) } })
    }

    #[test]
    fn test_decodes_full_batch() {
        let event = envelope_for(&json!({
            "messageType": "DATA_MESSAGE",
            "owner": "123456789012",
            "logGroup": "/aws/codebuild/backend",
            "logStream": "abc-123",
            "subscriptionFilters": ["errors"],
            "logEvents": [
                { "id": "1", "timestamp": 1700000000000_i64, "message": "first" },
                { "id": "2", "timestamp": 1700000000001_i64, "message": "second" }
            ]
        }));

        let data = decode_payload(&event).unwrap();
        assert_eq!(data.message_type.as_deref(), Some("DATA_MESSAGE"));
        assert_eq!(data.log_group.as_deref(), Some("/aws/codebuild/backend"));
        assert_eq!(data.subscription_filters, vec!["errors".to_string()]);

        let events = data.log_events.as_ref().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, Some(1_700_000_000_000));
        assert_eq!(aggregate_messages(&data), "first\nsecond");
    }

    #[test]
    fn test_missing_log_events_uses_placeholder() {
        let data = decode_payload(&envelope_for(&json!({ "messageType": "CONTROL_MESSAGE" }))).unwrap();
        assert!(data.log_events.is_none());
        assert_eq!(aggregate_messages(&data), NO_LOG_EVENTS);
    }

    #[test]
    fn test_non_array_log_events_uses_placeholder() {
        let data = decode_payload(&envelope_for(&json!({ "logEvents": "nope" }))).unwrap();
        assert_eq!(aggregate_messages(&data), NO_LOG_EVENTS);
    }

    #[test]
    fn test_keeps_duplicates_and_order() {
        let data = decode_payload(&envelope_for(&json!({
            "logEvents": [{ "message": "b" }, { "message": "a" }, { "message": "b" }]
        })))
        .unwrap();
        assert_eq!(aggregate_messages(&data), "b\na\nb");
    }

    #[test]
    fn test_tolerates_wrapped_base64() {
        let event = envelope_for(&json!({ "logEvents": [{ "message": "x" }] }));
        let data = event["awslogs"]["data"].as_str().unwrap();
        let (head, tail) = data.split_at(8);
        let wrapped = json!({ "awslogs": { "data": format!("{head}\n{tail}") } });

        assert_eq!(aggregate_messages(&decode_payload(&wrapped).unwrap()), "x");
    }

    #[test]
    fn test_non_alphabet_byte_inside_payload_is_error() {
        let event = envelope_for(&json!({ "logEvents": [{ "message": "x" }] }));
        let data = event["awslogs"]["data"].as_str().unwrap();
        let (head, tail) = data.split_at(8);
        let tainted = json!({ "awslogs": { "data": format!("{head}*{tail}") } });

        let err = decode_payload(&tainted).unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_missing_envelope_is_error() {
        let err = decode_payload(&json!({ "detail": {} })).unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }

    #[test]
    fn test_bad_base64_is_error() {
        let err = decode_payload(&json!({ "awslogs": { "data": "***not base64***" } })).unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_plain_deflate_is_rejected() {
        // Valid base64 of bytes that are not a gzip stream
        let event = json!({ "awslogs": { "data": STANDARD.encode(b"{\"logEvents\": []}") } });
        let err = decode_payload(&event).unwrap_err();
        assert!(matches!(err, DecodeError::Gzip(_)));
    }

    #[test]
    fn test_record_without_message_is_error() {
        let err = decode_payload(&envelope_for(&json!({
            "logEvents": [{ "message": "ok" }, { "id": "2" }]
        })))
        .unwrap_err();
        assert!(matches!(err, DecodeError::Record { index: 1 }));
    }
}
