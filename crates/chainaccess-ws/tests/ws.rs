//! End-to-end tests against an in-process WebSocket server.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value as Json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use chainaccess_core::message::{BlockDigestMessage, StreamKind};
use chainaccess_core::request::{BlockStatus, StartSelector};
use chainaccess_core::{InitError, SubscribeError, TransportError};
use chainaccess_stream::{AccessClient, CancellationToken};
use chainaccess_ws::{WsTransport, WsTransportConfig};

/// What the fake server does after reading the subscribe frame.
#[derive(Clone)]
enum Script {
    /// Ack, send each payload, then close.
    Serve(Vec<Json>),
    Reject(i64, &'static str),
    /// Ack, send each payload, then report an error.
    FailAfter(Vec<Json>, i64),
    /// Read the subscribe frame and never answer.
    Silent,
}

/// Serves a single connection and returns the subscribe frame it received.
async fn serve(script: Script) -> (String, tokio::task::JoinHandle<Json>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let request: Json = match ws.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected subscribe frame, got {other:?}"),
        };
        let id = request["subscription_id"].clone();
        let topic = request["topic"].clone();

        let ack = json!({"subscription_id": id, "action": "subscribe", "topic": topic});
        match script {
            Script::Serve(payloads) => {
                ws.send(Message::Text(ack.to_string())).await.unwrap();
                for p in payloads {
                    let frame = json!({"subscription_id": id, "topic": topic, "payload": p});
                    ws.send(Message::Text(frame.to_string())).await.unwrap();
                }
                ws.close(None).await.unwrap();
            }
            Script::Reject(code, message) => {
                let frame = json!({"subscription_id": id, "error": {"code": code, "message": message}});
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            Script::FailAfter(payloads, code) => {
                ws.send(Message::Text(ack.to_string())).await.unwrap();
                for p in payloads {
                    let frame = json!({"subscription_id": id, "topic": topic, "payload": p});
                    ws.send(Message::Text(frame.to_string())).await.unwrap();
                }
                let frame = json!({"subscription_id": id, "error": {"code": code, "message": "node restarting"}});
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            Script::Silent => {
                let _ = ws.next().await;
            }
        }
        request
    });
    (url, handle)
}

fn digest(height: u64) -> Json {
    let mut id = [0u8; 32];
    id[24..].copy_from_slice(&height.to_be_bytes());
    serde_json::to_value(BlockDigestMessage {
        block_id: id.to_vec(),
        block_height: height,
        block_timestamp: chrono::DateTime::from_timestamp(1_700_000_000 + height as i64, 0)
            .unwrap(),
    })
    .unwrap()
}

#[tokio::test]
async fn digests_flow_end_to_end() {
    let (url, server) = serve(Script::Serve(vec![digest(10), digest(11), digest(12)])).await;
    let client = AccessClient::new(WsTransport::connect_url(url));
    let cancel = CancellationToken::new();

    let mut sub = client
        .subscribe_block_digests(&cancel, StartSelector::Height(10), BlockStatus::Sealed)
        .await
        .unwrap();

    let mut heights = Vec::new();
    while let Some(d) = sub.next().await {
        heights.push(d.height);
    }
    assert_eq!(heights, vec![10, 11, 12]);
    assert!(sub.error().await.is_none());

    let request = server.await.unwrap();
    assert_eq!(request["action"], "subscribe");
    assert_eq!(request["topic"], StreamKind::BlockDigests.topic());
    assert_eq!(request["arguments"]["start_block_height"], 10);
    assert_eq!(request["arguments"]["block_status"], "sealed");
}

#[tokio::test]
async fn rejection_is_an_init_error() {
    let (url, _server) = serve(Script::Reject(400, "invalid start height")).await;
    let client = AccessClient::new(WsTransport::connect_url(url));

    let err = client
        .subscribe_block_digests(&CancellationToken::new(), StartSelector::Latest, BlockStatus::Finalized)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SubscribeError::Init(InitError::Rejected {
            code: 400,
            message: "invalid start height".into()
        })
    );
}

#[tokio::test]
async fn server_error_after_data_fails_the_stream() {
    let (url, _server) = serve(Script::FailAfter(vec![digest(1)], 500)).await;
    let client = AccessClient::new(WsTransport::connect_url(url));

    let mut sub = client
        .subscribe_block_digests(&CancellationToken::new(), StartSelector::Height(1), BlockStatus::Finalized)
        .await
        .unwrap();

    assert_eq!(sub.next().await.map(|d| d.height), Some(1));
    assert!(sub.next().await.is_none());
    let err = sub.error().await.expect("terminal error");
    assert!(err.is_transport());
    assert!(err.to_string().contains("node restarting"));
    assert!(matches!(
        err,
        chainaccess_core::StreamError::Transport {
            source: TransportError::Remote { code: 500, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn silent_server_times_out() {
    let (url, _server) = serve(Script::Silent).await;
    let transport = WsTransport::new(WsTransportConfig::new(url).with_connect_timeout_ms(200));
    let client = AccessClient::new(transport);

    let err = client
        .subscribe_block_digests(&CancellationToken::new(), StartSelector::Latest, BlockStatus::Finalized)
        .await
        .unwrap_err();
    assert_eq!(err, SubscribeError::Init(InitError::Timeout { ms: 200 }));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_connect_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = AccessClient::new(WsTransport::connect_url(url.clone()));
    let err = client
        .subscribe_block_digests(&CancellationToken::new(), StartSelector::Latest, BlockStatus::Finalized)
        .await
        .unwrap_err();
    assert!(matches!(err, SubscribeError::Init(InitError::Connect { url: u, .. }) if u == url));
}
