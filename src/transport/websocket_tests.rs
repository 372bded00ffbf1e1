use crate::broker::Relay;
use crate::transport::websocket::{bind, serve};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn setup_server(relay: Arc<Relay>) -> String {
    let listener = bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, relay));
    format!("ws://{addr}")
}

async fn open(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("WebSocket handshake failed");
    ws
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(WsMessage::text(value.to_string()))
        .await
        .expect("Failed to send message");
}

async fn join(ws: &mut Ws, topic: &str) {
    send_json(
        ws,
        json!({ "topic": topic, "message_type": "chat_connect", "payload": {} }),
    )
    .await;
}

async fn recv_json(ws: &mut Ws) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("read error");
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

async fn assert_silent(ws: &mut Ws) {
    let next = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(next.is_err(), "unexpected frame: {next:?}");
}

async fn wait_until(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn test_broadcast_to_topic_subscribers() {
    let relay = Arc::new(Relay::new());
    let url = setup_server(relay.clone()).await;
    let mut c1 = open(&url).await;
    let mut c2 = open(&url).await;

    join(&mut c1, "general").await;
    join(&mut c2, "general").await;
    wait_until(|| relay.subscriber_count("general") == 2).await;

    send_json(
        &mut c1,
        json!({ "topic": "general", "message_type": "new_message", "payload": { "text": "hi" } }),
    )
    .await;

    let expected =
        json!({ "topic": "general", "message_type": "new_message", "payload": { "text": "hi" } });
    assert_eq!(recv_json(&mut c2).await, expected);
    assert_eq!(recv_json(&mut c1).await, expected);
}

#[tokio::test]
async fn test_malformed_frame_is_isolated() {
    let relay = Arc::new(Relay::new());
    let url = setup_server(relay.clone()).await;
    let mut x = open(&url).await;
    let mut y = open(&url).await;

    join(&mut y, "general").await;
    wait_until(|| relay.subscriber_count("general") == 1).await;

    x.send(WsMessage::text("{ this is not json")).await.unwrap();
    send_json(
        &mut x,
        json!({ "topic": "general", "message_type": "new_message", "payload": { "n": 1 } }),
    )
    .await;

    assert_eq!(recv_json(&mut y).await["payload"]["n"], 1);
    assert_eq!(relay.connection_count(), 2);
}

#[tokio::test]
async fn test_unknown_type_is_not_dispatched() {
    let relay = Arc::new(Relay::new());
    let url = setup_server(relay.clone()).await;
    let mut c1 = open(&url).await;

    join(&mut c1, "general").await;
    wait_until(|| relay.subscriber_count("general") == 1).await;

    send_json(
        &mut c1,
        json!({ "topic": "general", "message_type": "reply_message", "payload": { "n": 1 } }),
    )
    .await;
    send_json(
        &mut c1,
        json!({ "topic": "general", "message_type": "new_message", "payload": { "n": 2 } }),
    )
    .await;

    assert_eq!(recv_json(&mut c1).await["payload"]["n"], 2);
}

#[tokio::test]
async fn test_binary_json_frame_is_accepted() {
    let relay = Arc::new(Relay::new());
    let url = setup_server(relay.clone()).await;
    let mut c1 = open(&url).await;

    let connect = json!({ "topic": "bin", "message_type": "chat_connect", "payload": {} });
    c1.send(WsMessage::binary(connect.to_string().into_bytes()))
        .await
        .unwrap();

    wait_until(|| relay.subscriber_count("bin") == 1).await;
}

#[tokio::test]
async fn test_disconnect_cleans_up_subscriptions() {
    let relay = Arc::new(Relay::new());
    let url = setup_server(relay.clone()).await;
    let mut c1 = open(&url).await;
    let mut c2 = open(&url).await;

    join(&mut c1, "general").await;
    join(&mut c1, "random").await;
    join(&mut c2, "general").await;
    wait_until(|| relay.subscriber_count("general") == 2 && relay.subscriber_count("random") == 1)
        .await;

    c1.close(None).await.unwrap();
    drop(c1);

    wait_until(|| relay.connection_count() == 1).await;
    assert_eq!(relay.subscriber_count("general"), 1);
    assert_eq!(relay.subscriber_count("random"), 0);

    send_json(
        &mut c2,
        json!({ "topic": "general", "message_type": "new_message", "payload": { "text": "still here" } }),
    )
    .await;
    assert_eq!(recv_json(&mut c2).await["payload"]["text"], "still here");
}

#[tokio::test]
async fn test_echo_disabled_skips_publisher() {
    let relay = Arc::new(Relay::new().echo_to_sender(false));
    let url = setup_server(relay.clone()).await;
    let mut c1 = open(&url).await;
    let mut c2 = open(&url).await;

    join(&mut c1, "general").await;
    join(&mut c2, "general").await;
    wait_until(|| relay.subscriber_count("general") == 2).await;

    send_json(
        &mut c1,
        json!({ "topic": "general", "message_type": "new_message", "payload": { "text": "hi" } }),
    )
    .await;

    assert_eq!(recv_json(&mut c2).await["payload"]["text"], "hi");
    assert_silent(&mut c1).await;
}

#[tokio::test]
async fn test_dropped_peer_is_torn_down_once() {
    let relay = Arc::new(Relay::new());
    let url = setup_server(relay.clone()).await;
    let mut gone = open(&url).await;
    let mut stays = open(&url).await;

    join(&mut gone, "general").await;
    join(&mut stays, "general").await;
    wait_until(|| relay.subscriber_count("general") == 2).await;

    // No close frame: the socket just disappears
    drop(gone);

    let publish =
        json!({ "topic": "general", "message_type": "new_message", "payload": { "n": 1 } });
    send_json(&mut stays, publish).await;
    assert_eq!(recv_json(&mut stays).await["payload"]["n"], 1);

    wait_until(|| relay.connection_count() == 1).await;
    assert_eq!(relay.subscriber_count("general"), 1);

    // A second teardown attempt must not touch the surviving connection
    send_json(
        &mut stays,
        json!({ "topic": "general", "message_type": "new_message", "payload": { "n": 2 } }),
    )
    .await;
    assert_eq!(recv_json(&mut stays).await["payload"]["n"], 2);
    assert_eq!(relay.connection_count(), 1);
    assert_eq!(relay.subscriber_count("general"), 1);
}
