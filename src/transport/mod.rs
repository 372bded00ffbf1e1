//! The `transport` module is the connection handler of the relay.
//!
//! It accepts WebSocket connections, decodes framing and forwards each
//! text frame to the relay, and reports stream termination so the relay can
//! clean up.

pub mod websocket;

pub use websocket::{bind, run_server, serve, serve_until, start_websocket_server};

#[cfg(test)]
mod websocket_tests;
