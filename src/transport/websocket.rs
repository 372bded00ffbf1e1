//! WebSocket transport
//!
//! This file implements the WebSocket server that feeds client frames into
//! the relay. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Create a `Client` for each connection and register it with the `Relay`
//!   before the first frame is read
//! - Forward text frames to the relay in arrival order
//! - Drain the per-connection outbound channel into the socket
//! - Tear the connection down exactly once when either direction ends

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Relay;
use crate::client::{Client, ConnectionId};
use crate::config::Settings;

pub async fn bind(addr: &str) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, relay: Arc<Relay>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let relay = relay.clone();
                spawn(handle_connection(stream, peer, relay));
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
}

/// Serve until `shutdown` resolves.
pub async fn serve_until<F>(listener: TcpListener, relay: Arc<Relay>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = serve(listener, relay) => {
            error!("WebSocket server exited unexpectedly.");
        }
        _ = shutdown => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }
}

pub async fn start_websocket_server(addr: &str, relay: Arc<Relay>) -> std::io::Result<()> {
    let listener = bind(addr).await?;
    serve(listener, relay).await;
    Ok(())
}

/// Build the relay from `settings`, bind the configured address and serve
/// until `shutdown` resolves.
pub async fn run_server<F>(settings: &Settings, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let relay = Arc::new(Relay::from_settings(&settings.relay));
    info!(
        schema = ?settings.relay.payload_schema,
        echo_to_sender = settings.relay.echo_to_sender,
        "relay ready"
    );

    let addr = settings.server.addr();
    let listener = bind(&addr).await?;
    serve_until(listener, relay, shutdown).await;
    Ok(())
}

/// Tears a connection down once, whichever side of the socket ends first.
pub(crate) struct Teardown {
    relay: Arc<Relay>,
    client_id: ConnectionId,
    called: AtomicBool,
}

impl Teardown {
    pub(crate) fn new(relay: Arc<Relay>, client_id: ConnectionId) -> Self {
        Self {
            relay,
            client_id,
            called: AtomicBool::new(false),
        }
    }

    /// Returns `true` only for the call that actually ran the teardown.
    pub(crate) fn run(&self) -> bool {
        if self.called.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.relay.disconnect(&self.client_id);
        true
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, relay: Arc<Relay>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!(%peer, "WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    let client_id = client.id.clone();
    info!(connection = %client_id, %peer, "connection accepted");

    // Register client before doing anything else
    relay.connect(client);

    let teardown = Arc::new(Teardown::new(relay.clone(), client_id.clone()));

    // Forward messages from relay -> client
    {
        let client_id = client_id.clone();
        let teardown = teardown.clone();

        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!(connection = %client_id, "Failed to send message: {e}");
                    break;
                }
            }

            if teardown.run() {
                debug!(connection = %client_id, "torn down by send loop");
            }
            debug!(connection = %client_id, "send loop closed");
        });
    }

    // Handle incoming messages from client
    while let Some(next) = ws_receiver.next().await {
        let msg = match next {
            Ok(msg) => msg,
            Err(e) => {
                warn!(connection = %client_id, "read error: {e}");
                break;
            }
        };

        match msg {
            WsMessage::Text(text) => relay.handle_frame(&client_id, text.as_str()),
            WsMessage::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => relay.handle_frame(&client_id, text),
                Err(e) => error!(connection = %client_id, "undecodable binary frame: {e}"),
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!(connection = %client_id, "disconnected");
    teardown.run();
}
