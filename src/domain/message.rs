//! Outbound chat message, in the Slack incoming-webhook format.

use serde::{Deserialize, Serialize};

/// A single chat message posted to the webhook.
///
/// Plain messages carry `text`; structured messages carry `blocks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub channel: String,

    /// Display name shown as the sender
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl ChatMessage {
    /// Create a plain-text message
    pub fn text(
        channel: impl Into<String>,
        username: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            username: username.into(),
            text: Some(text.into()),
            blocks: Vec::new(),
        }
    }

    /// Create a block-formatted message
    pub fn blocks(channel: impl Into<String>, username: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            channel: channel.into(),
            username: username.into(),
            text: None,
            blocks,
        }
    }
}

/// Layout blocks used by the structured messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: TextObject },
    Section { text: TextObject },
    Divider,
    Context { elements: Vec<TextObject> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    PlainText { text: String },

    #[serde(rename = "mrkdwn")]
    Markdown { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::Markdown { text: text.into() }
    }
}
