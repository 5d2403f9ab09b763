use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::*;
use crate::protocol::{encode_fragment, TurnResponseFragment, TurnStatus};
use crate::session::{ChatSession, Credentials, SessionConfig, SessionState};
use crate::{Endpoint, Role};

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{addr}/v3.1/chat"))
}

fn reply(status: TurnStatus, content: &str) -> WsMessage {
    let fragment = TurnResponseFragment {
        status_code: 0,
        status_message: "Success".into(),
        sid: "cht000loop".into(),
        turn_status: status,
        role: Role::Assistant,
        content_delta: content.into(),
        choice_index: 0,
        usage: None,
    };
    WsMessage::Text(encode_fragment(&fragment).unwrap().into())
}

#[tokio::test]
async fn exchanges_text_frames() {
    let (listener, url) = listener().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let Some(Ok(WsMessage::Text(text))) = ws.next().await else {
            panic!("expected a text frame");
        };
        ws.send(WsMessage::Ping(vec![1].into())).await.unwrap();
        ws.send(WsMessage::Text(format!("echo:{}", text.as_str()).into()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
    });

    let transport = WsTransport::new();
    let mut conn = transport.connect(&url).await.unwrap();
    conn.send("ping".into()).await.unwrap();

    // Ping frames are answered by tungstenite and never surface.
    assert_eq!(
        conn.recv().await,
        TransportEvent::Message("echo:ping".into())
    );
    assert_eq!(conn.recv().await, TransportEvent::Closed);
    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let (listener, url) = listener().await;
    drop(listener);

    let err = WsTransport::new().connect(&url).await.err().unwrap();
    assert!(matches!(err, ChatError::TransportError(_)));
}

#[tokio::test]
async fn stalled_handshake_times_out() {
    let (listener, url) = listener().await;
    // Accept the TCP connection but never answer the upgrade.
    let _server = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let transport = WsTransport::new().with_connect_timeout(Duration::from_millis(100));
    let err = transport.connect(&url).await.err().unwrap();
    assert!(matches!(err, ChatError::TransportError(ref m) if m.contains("timed out")));
}

#[tokio::test]
async fn session_round_trip_over_websocket() {
    let (listener, url) = listener().await;
    let seen_query = Arc::new(Mutex::new(None::<String>));

    let server = {
        let seen_query = Arc::clone(&seen_query);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                *seen_query.lock().unwrap() = req.uri().query().map(str::to_string);
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                .await
                .unwrap();

            let Some(Ok(WsMessage::Text(text))) = ws.next().await else {
                panic!("expected a request frame");
            };
            let request: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(request["header"]["app_id"], "app-loop");
            assert_eq!(request["payload"]["message"]["text"][0]["content"], "hi");

            for (status, content) in [
                (TurnStatus::First, "Hel"),
                (TurnStatus::Middle, "lo"),
                (TurnStatus::Last, "!"),
            ] {
                ws.send(reply(status, content)).await.unwrap();
            }
            // Drain until the client closes.
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        })
    };

    let config = SessionConfig::new(
        Credentials::new("app-loop", "key-loop", "secret-loop"),
        Endpoint::custom("generalv3", url),
    );
    let mut session = ChatSession::new(config, Arc::new(WsTransport::new())).unwrap();

    let mut streamed = Vec::new();
    let turn = session
        .chat("hi", |d| streamed.push(d.to_string()))
        .await
        .unwrap();

    assert_eq!(turn.content, "Hello!");
    assert_eq!(streamed, vec!["Hel", "lo", "!"]);
    assert_eq!(session.state(), SessionState::Closed);
    server.await.unwrap();

    let query = seen_query.lock().unwrap().clone().unwrap();
    let params: Vec<&str> = query
        .split('&')
        .filter_map(|pair| pair.split_once('=').map(|(k, _)| k))
        .collect();
    assert_eq!(params, vec!["authorization", "date", "host"]);
    assert!(query.contains("host=127.0.0.1%3A"));
}
