use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A text message received from the chat platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform update counter. Strictly increasing within one transport.
    pub update_id: i64,

    /// Conversation to reply into.
    pub chat_id: String,

    /// Platform-native identifier of the sender (numeric user id).
    pub sender_id: String,

    /// `@username` without the `@`, if the sender has one.
    pub sender_name: Option<String>,

    /// Plain text content of the message.
    pub content: String,

    pub timestamp: DateTime<Utc>,
}

/// A plain-text message to deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: String,
    pub content: String,
}

impl OutboundMessage {
    pub fn new(chat_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            content: content.into(),
        }
    }

    /// A reply into the conversation `msg` came from.
    pub fn reply_to(msg: &InboundMessage, content: impl Into<String>) -> Self {
        Self::new(msg.chat_id.clone(), content)
    }
}
