//! End-to-end tests for the alert flow over a real listener.
//!
//! Covers ingestion over HTTP, history retrieval, live delivery to
//! WebSocket subscribers, and subscriber cleanup on disconnect.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use alerthub_server::broker::Broker;
use alerthub_server::config::Config;
use alerthub_server::routes::{create_router, AppState};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_alert(event_type: &str, severity: &str, message: &str) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "source": "integration-agent",
        "event_type": event_type,
        "severity": severity,
        "message": message,
        "timestamp": "2024-05-01T12:00:00",
        "payload": { "value": 95 }
    })
}

/// Spawns a server on a random port. Returns its address and task handle.
async fn spawn_test_server(max_alerts: usize) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let config = Config {
        port: 0,
        max_alerts,
        ..Config::default()
    };
    let state = AppState::with_broker(config, Broker::new(max_alerts));
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, handle)
}

async fn post_alert(addr: SocketAddr, alert: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/alert"))
        .json(alert)
        .send()
        .await
        .unwrap()
}

async fn health(addr: SocketAddr) -> Value {
    reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

/// Polls /health until the subscriber count matches.
async fn wait_for_subscribers(addr: SocketAddr, expected: u64) {
    timeout(Duration::from_secs(5), async {
        loop {
            if health(addr).await["subscribers"] == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("subscriber count never reached {expected}"));
}

// ============================================================================
// HTTP
// ============================================================================

#[tokio::test]
async fn posted_alert_appears_in_history() {
    let (addr, handle) = spawn_test_server(200).await;

    let alert = test_alert("cpu_high", "high", "CPU 95%");
    let response = post_alert(addr, &alert).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));

    let history: Vec<Value> = reqwest::get(format!("http://{addr}/alerts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0], alert);

    handle.abort();
}

#[tokio::test]
async fn history_keeps_only_newest_alerts() {
    let (addr, handle) = spawn_test_server(3).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let alert = test_alert("disk_full", "medium", &format!("disk {i}"));
        ids.push(alert["id"].as_str().unwrap().to_string());
        assert_eq!(post_alert(addr, &alert).await.status(), 200);
    }

    let history: Vec<Value> = reqwest::get(format!("http://{addr}/alerts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let got: Vec<&str> = history.iter().map(|a| a["id"].as_str().unwrap()).collect();
    assert_eq!(got, ids[2..].iter().map(String::as_str).collect::<Vec<_>>());

    handle.abort();
}

#[tokio::test]
async fn malformed_alert_is_rejected_and_not_stored() {
    let (addr, handle) = spawn_test_server(200).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/alert"))
        .header("Content-Type", "application/json")
        .body(r#"{"id":"x","source":"s"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_format");
    assert_eq!(health(addr).await["alerts"], 0);

    handle.abort();
}

// ============================================================================
// WebSocket
// ============================================================================

#[tokio::test]
async fn websocket_subscriber_receives_alert() {
    let (addr, handle) = spawn_test_server(200).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("WebSocket connect failed");
    wait_for_subscribers(addr, 1).await;

    let alert = test_alert("cpu_high", "high", "CPU 95%");
    assert_eq!(post_alert(addr, &alert).await.status(), 200);

    let msg = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("no alert received in time")
        .expect("stream ended")
        .expect("WebSocket error");

    let received: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
    assert_eq!(received, alert);

    handle.abort();
}

#[tokio::test]
async fn all_subscribers_receive_alerts_in_order() {
    let (addr, handle) = spawn_test_server(200).await;

    let (mut ws_a, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let (mut ws_b, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    wait_for_subscribers(addr, 2).await;

    let first = test_alert("cpu_high", "high", "first");
    let second = test_alert("mem_high", "low", "second");
    post_alert(addr, &first).await;
    post_alert(addr, &second).await;

    for ws in [&mut ws_a, &mut ws_b] {
        let mut messages = Vec::new();
        for _ in 0..2 {
            let msg = timeout(Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            let value: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
            messages.push(value["message"].as_str().unwrap().to_string());
        }
        assert_eq!(messages, vec!["first", "second"]);
    }

    handle.abort();
}

#[tokio::test]
async fn disconnected_subscriber_is_removed() {
    let (addr, handle) = spawn_test_server(200).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    wait_for_subscribers(addr, 1).await;

    ws.send(Message::Close(None)).await.unwrap();
    drop(ws);
    wait_for_subscribers(addr, 0).await;

    // Ingestion still succeeds with nobody listening.
    let alert = test_alert("cpu_high", "high", "after disconnect");
    assert_eq!(post_alert(addr, &alert).await.status(), 200);
    assert_eq!(health(addr).await["alerts"], 1);

    handle.abort();
}

#[tokio::test]
async fn client_messages_are_ignored() {
    let (addr, handle) = spawn_test_server(200).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    wait_for_subscribers(addr, 1).await;

    ws.send(Message::Text("hello server".into())).await.unwrap();

    let alert = test_alert("net_down", "critical", "link lost");
    post_alert(addr, &alert).await;

    let msg = timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let received: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
    assert_eq!(received["id"], alert["id"]);
    assert_eq!(health(addr).await["subscribers"], 1);

    handle.abort();
}
