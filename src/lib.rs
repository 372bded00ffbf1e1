//! # ChatSub
//!
//! `chatsub` is an in-memory, topic-based publish/subscribe relay for chat
//! clients. Clients hold a WebSocket open, join topics with `chat_connect`
//! and publish with `new_message`; every published envelope is fanned out to
//! the current subscribers of its topic.
//!
//! ## Core Modules
//!
//! - `broker`: envelopes, the topic index, the connection registry and the relay engine.
//! - `client`: the outbound handle of one connection.
//! - `config`: loading server and relay configuration.
//! - `payload`: pluggable validation of published payloads.
//! - `transport`: the WebSocket server feeding frames into the relay.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod payload;
pub mod transport;
pub mod utils;
