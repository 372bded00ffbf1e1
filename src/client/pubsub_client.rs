use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::utils::RelayError;

pub type ConnectionId = String;

/// Represents a connected WebSocket client in the relay.
///
/// Each client is uniquely identified by an `id` and owns the sending half
/// of a per-connection channel. A writer task drains the other half into
/// the socket, so sending never blocks the caller.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for the connection, `client-<uuid>`.
    pub id: ConnectionId,

    /// Channel to send WebSocket messages to the client.
    pub sender: UnboundedSender<WsMessage>,
}

impl Client {
    /// Create a client with a freshly generated id.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self::with_id(format!("client-{}", Uuid::new_v4()), sender)
    }

    pub fn with_id(id: impl Into<ConnectionId>, sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: id.into(),
            sender,
        }
    }

    /// Queue a frame for this client. Fails once the writer side has gone away.
    pub fn send(&self, msg: WsMessage) -> Result<(), RelayError> {
        self.sender
            .send(msg)
            .map_err(|_| RelayError::Transport(self.id.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
