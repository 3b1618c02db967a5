//! The status object handlers hand back to the invoking runtime.

use serde::{Deserialize, Serialize};

/// `{ "statusCode": 200, "body": "\"Success\"" }`
///
/// `body` holds a JSON-encoded string, matching what API-style callers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn new(status_code: u16, message: &str) -> Self {
        // Encoding a &str as JSON cannot fail
        let body = serde_json::Value::String(message.to_string()).to_string();
        Self { status_code, body }
    }

    pub fn ok(message: &str) -> Self {
        Self::new(200, message)
    }

    pub fn error(message: &str) -> Self {
        Self::new(500, message)
    }

    /// Decoded body text, if the body is a JSON string
    pub fn message(&self) -> Option<String> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_is_json_encoded() {
        let resp = HandlerResponse::ok("Success");
        assert_eq!(resp.body, "\"Success\"");
        assert_eq!(resp.message().as_deref(), Some("Success"));
        assert!(resp.is_success());
    }

    #[test]
    fn test_serializes_status_code_camel_case() {
        let json = serde_json::to_value(HandlerResponse::error("Error occurred")).unwrap();
        assert_eq!(json["statusCode"], 500);
        assert_eq!(json["body"], "\"Error occurred\"");
    }
}
