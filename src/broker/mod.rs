//! The broker owns the relay state: envelopes, the topic index, the
//! connection registry and the engine that ties them together.

pub mod engine;
pub mod message;
pub mod registry;
pub mod topic;

pub use engine::{Dispatch, Relay};
pub use message::{Envelope, MessageType};
