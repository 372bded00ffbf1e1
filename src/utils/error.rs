//! The `error` module defines the error taxonomy of the relay.
//!
//! None of these errors is fatal to the service. The relay logs and absorbs
//! them at the frame boundary, so a single bad message or stale connection
//! never affects any other connection.

use thiserror::Error;

use crate::client::ConnectionId;
use crate::payload::SchemaError;

#[derive(Error, Debug)]
pub enum RelayError {
    /// The inbound frame could not be decoded into an envelope.
    #[error("malformed envelope: {0}")]
    Decode(#[from] serde_json::Error),

    /// A `chat_connect` or `new_message` envelope arrived without a topic.
    #[error("`{0}` envelope has no topic")]
    MissingTopic(String),

    #[error("payload rejected: {0}")]
    Schema(#[from] SchemaError),

    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),

    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// The outbound channel of a connection is closed.
    #[error("failed to send to {0}")]
    Transport(ConnectionId),
}
