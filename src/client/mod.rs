//! The `client` module defines the representation of a connection in the relay.
//!
//! It provides the `Client` struct, which encapsulates the identity of a
//! single connection and the channel used to push frames to it.

pub mod pubsub_client;
pub use pubsub_client::{Client, ConnectionId};
