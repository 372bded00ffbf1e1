//! Envelope definitions
//!
//! `Envelope` is the unit exchanged over a connection in both directions:
//!
//! ```json
//! { "topic": "general", "message_type": "new_message", "payload": { ... } }
//! ```
//!
//! Notes on fields:
//! - `topic`: topic name used for routing; defaults to `""` when absent
//! - `message_type`: dispatch discriminator. Unrecognized strings are kept
//!   as `MessageType::Unknown` so newer clients do not break older relays
//! - `payload`: opaque JSON object; defaults to `{}` when absent

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tungstenite::protocol::Message as WsMessage;

use crate::utils::RelayError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// `chat_connect`: subscribe the sending connection to `topic`.
    ChatConnect,
    /// `new_message`: broadcast `payload` to every subscriber of `topic`.
    NewMessage,
    Unknown(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::ChatConnect => "chat_connect",
            MessageType::NewMessage => "new_message",
            MessageType::Unknown(other) => other,
        }
    }
}

impl From<String> for MessageType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "chat_connect" => MessageType::ChatConnect,
            "new_message" => MessageType::NewMessage,
            _ => MessageType::Unknown(value),
        }
    }
}

impl From<MessageType> for String {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub topic: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Decode one inbound frame.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the outbound frame for a broadcast.
    pub fn publish(topic: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            topic: topic.into(),
            message_type: MessageType::NewMessage,
            payload,
        }
    }

    /// The topic, if this envelope carries a usable one.
    pub fn topic(&self) -> Option<&str> {
        (!self.topic.trim().is_empty()).then_some(self.topic.as_str())
    }

    pub fn to_frame(&self) -> Result<WsMessage, RelayError> {
        Ok(WsMessage::text(serde_json::to_string(self)?))
    }
}
