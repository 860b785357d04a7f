//! End-to-end checks of the realtime manager against a local websocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use modconsole_core::auth::Credential;
use modconsole_core::config::RealtimeSettings;
use modconsole_core::notice::{self, Notice};
use modconsole_core::realtime::{CLOSE_CONNECTION_LIMIT, RealtimeManager, VIDEO_EDIT_COMPLETED};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

const WAIT: Duration = Duration::from_secs(5);

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn fast_settings() -> RealtimeSettings {
    RealtimeSettings {
        reconnect_base_delay_ms: 25,
        ..RealtimeSettings::default()
    }
}

#[tokio::test]
async fn test_handshake_heartbeat_delivery_and_connection_limit() {
    let (listener, base) = listen().await;
    let (uri_tx, mut uri_rx) = mpsc::unbounded_channel();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let record_uri = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            uri_tx.send(req.uri().to_string()).unwrap();
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, record_uri)
        .await
        .unwrap();

        let first = ws.next().await.unwrap().unwrap();
        assert_eq!(first.to_text().unwrap(), "ping");
        ws.send(Message::Text("pong".into())).await.unwrap();

        let frame = format!("{}|{}", VIDEO_EDIT_COMPLETED, json!({ "user_id": "u1" }));
        ws.send(Message::Text(frame.into())).await.unwrap();

        let hello = ws.next().await.unwrap().unwrap();
        assert_eq!(hello.to_text().unwrap(), r#"{"type":"hello"}"#);

        ws.close(Some(CloseFrame {
            code: CloseCode::from(CLOSE_CONNECTION_LIMIT),
            reason: "too many sessions".into(),
        }))
        .await
        .unwrap();
        // Drain until the client acknowledges the close.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (tx, mut notices) = notice::channel();
    let manager = RealtimeManager::new(Credential::new("tok"), base, fast_settings(), tx);
    let (_subscription, mut messages) = manager.subscribe_channel();
    manager.connect();

    let message = timeout(WAIT, messages.recv()).await.unwrap().unwrap();
    assert!(message.is(VIDEO_EDIT_COMPLETED));
    assert_eq!(message.payload["user_id"], "u1");
    assert!(manager.is_connected());

    manager.send_message(&json!({ "type": "hello" })).unwrap();

    let notice = timeout(WAIT, notices.recv()).await.unwrap();
    assert_eq!(notice, Some(Notice::ConnectionLimitReached));
    timeout(WAIT, server).await.unwrap().unwrap();
    assert!(!manager.is_connected());

    let uri = uri_rx.recv().await.unwrap();
    assert!(uri.starts_with("/ws?token=Bearer"), "unexpected uri {uri}");
}

#[tokio::test]
async fn test_dropped_connection_is_reestablished() {
    let (listener, base) = listen().await;

    let server = tokio::spawn(async move {
        // First connection: vanish without a close frame.
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);

        // Second connection: answer the probe and announce a topic.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let probe = ws.next().await.unwrap().unwrap();
        assert_eq!(probe.to_text().unwrap(), "ping");
        ws.send(Message::Text("pong".into())).await.unwrap();
        ws.send(Message::Text("reconnected|{}".into())).await.unwrap();
        ws
    });

    let (tx, _notices) = notice::channel();
    let manager = RealtimeManager::new(Credential::new("tok"), base, fast_settings(), tx);
    let (_subscription, mut messages) = manager.subscribe_channel();
    manager.connect();

    let message = timeout(WAIT, messages.recv()).await.unwrap().unwrap();
    assert_eq!(message.topic, "reconnected");
    assert!(manager.is_connected());
    assert!(manager.connection_stamp().is_some());

    let _ws = server.await.unwrap();
    manager.shutdown();
}
