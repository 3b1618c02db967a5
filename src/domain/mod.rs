//! Domain types for the relay handlers.
//!
//! This module contains the data structures that cross handler boundaries:
//! - Events: Inbound pipeline state changes and log subscription envelopes
//! - Message: The outbound chat message and its blocks
//! - Response: The status object every handler returns to its caller

pub mod events;
pub mod message;
pub mod response;

// Re-export commonly used types
pub use events::{BuildId, LogRecord, LogsData, StatusEvent, SubscriptionEnvelope};
pub use message::{Block, ChatMessage, TextObject};
pub use response::HandlerResponse;
