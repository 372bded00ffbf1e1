//! Chat content models.
//!
//! `ChatMessage` is the body of a `new_message` envelope in the chat
//! application; `ChatConnect` is the body clients send with `chat_connect`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::{PayloadValidator, SchemaError};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "new_id")]
    pub id: String,
    pub sent_by_id: String,
    pub sent_by_username: String,
    pub selected_color: String,
    pub content: String,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_sent")]
    pub sent: DateTime<Utc>,
    #[serde(default)]
    pub reply_thread_id: Option<String>,
}

/// RFC 3339, or an ISO 8601 timestamp without offset taken as UTC.
fn deserialize_sent<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(sent) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(sent.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| de::Error::custom(format!("invalid `sent` timestamp {raw:?}: {e}")))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConnect {
    #[serde(default = "new_id")]
    pub id: String,
    pub user_id: String,
    pub channel: String,
}

/// Requires every `new_message` payload to be a `ChatMessage`.
///
/// The broadcast payload is the canonical serialization: missing `id` and
/// `sent` are filled in, `reply_thread_id` is always present and unknown
/// fields are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatMessageSchema;

impl PayloadValidator for ChatMessageSchema {
    fn validate(&self, raw: Map<String, Value>) -> Result<Map<String, Value>, SchemaError> {
        let message: ChatMessage = serde_json::from_value(Value::Object(raw))?;
        debug!(
            username = %message.sent_by_username,
            content = %message.content,
            "chat message accepted"
        );

        match serde_json::to_value(&message)? {
            Value::Object(map) => Ok(map),
            _ => Err(SchemaError::NotAnObject),
        }
    }
}
