//! Payload validation
//!
//! The relay treats payloads as opaque JSON objects. What a valid payload
//! looks like belongs to the application on top of the relay, so it is
//! injected as a `PayloadValidator` when the relay is built.
//!
//! Two validators ship with the crate:
//! - `OpaquePayload` passes any object through unchanged
//! - `ChatMessageSchema` enforces the chat message content model and
//!   returns its canonical form (generated `id`, `sent` timestamp)

pub mod chat;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use chat::{ChatConnect, ChatMessage, ChatMessageSchema};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{0}")]
    Invalid(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Validates the payload of a `new_message` envelope before it is broadcast.
pub trait PayloadValidator: Send + Sync {
    /// Return the payload to broadcast, or reject the message.
    fn validate(&self, raw: Map<String, Value>) -> Result<Map<String, Value>, SchemaError>;
}

/// Accepts every payload unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpaquePayload;

impl PayloadValidator for OpaquePayload {
    fn validate(&self, raw: Map<String, Value>) -> Result<Map<String, Value>, SchemaError> {
        Ok(raw)
    }
}

/// Validator selection, as written in configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSchema {
    #[default]
    Opaque,
    ChatMessage,
}

impl PayloadSchema {
    pub fn validator(self) -> Box<dyn PayloadValidator> {
        match self {
            PayloadSchema::Opaque => Box::new(OpaquePayload),
            PayloadSchema::ChatMessage => Box::new(ChatMessageSchema),
        }
    }
}
