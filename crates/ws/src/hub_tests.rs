// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use hvfleet_core::{Broadcaster, FakeClock};

use super::fake::{RecordingSink, StallingSink};
use super::*;

fn hub() -> WsHub<FakeClock> {
    WsHub::new(FakeClock::new(), Duration::from_millis(500))
}

#[tokio::test]
async fn connect_sends_connection_handshake() {
    let hub = hub();
    let sink = Arc::new(RecordingSink::new());
    let id = hub.connect(sink.clone()).await;

    let frames = sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "connection");
    assert_eq!(frames[0]["client_id"], serde_json::json!(id));
    assert_eq!(hub.connected_count(), 1);
}

#[tokio::test]
async fn disconnect_removes_client() {
    let hub = hub();
    let sink = Arc::new(RecordingSink::new());
    let id = hub.connect(sink).await;
    hub.disconnect(id);
    assert_eq!(hub.connected_count(), 0);
}

#[tokio::test]
async fn subscribe_then_broadcast_reaches_matching_topic_only() {
    let hub = hub();
    let a = Arc::new(RecordingSink::new());
    let b = Arc::new(RecordingSink::new());
    let id_a = hub.connect(a.clone()).await;
    let id_b = hub.connect(b.clone()).await;

    hub.subscribe(id_a, vec!["jobs".to_string()]).await.unwrap();
    hub.subscribe(id_b, vec!["notifications".to_string()]).await.unwrap();

    hub.broadcast(Some("jobs".to_string()), serde_json::json!({"type": "job"})).await;

    assert!(a.frames().iter().any(|f| f["type"] == "job"));
    assert!(!b.frames().iter().any(|f| f["type"] == "job"));
}

#[tokio::test]
async fn wildcard_subscription_receives_every_topic() {
    let hub = hub();
    let sink = Arc::new(RecordingSink::new());
    let id = hub.connect(sink.clone()).await;
    hub.subscribe(id, vec!["all".to_string()]).await.unwrap();

    hub.broadcast(Some("jobs".to_string()), serde_json::json!({"type": "job"})).await;
    hub.broadcast(Some("notifications".to_string()), serde_json::json!({"type": "notification"})).await;

    let types: Vec<_> = sink.frames().iter().map(|f| f["type"].clone()).collect();
    assert!(types.contains(&serde_json::json!("job")));
    assert!(types.contains(&serde_json::json!("notification")));
}

#[tokio::test]
async fn broadcast_without_topic_reaches_every_client() {
    let hub = hub();
    let a = Arc::new(RecordingSink::new());
    let b = Arc::new(RecordingSink::new());
    hub.connect(a.clone()).await;
    hub.connect(b.clone()).await;

    hub.broadcast(None, serde_json::json!({"type": "pong"})).await;

    assert!(a.frames().iter().any(|f| f["type"] == "pong"));
    assert!(b.frames().iter().any(|f| f["type"] == "pong"));
}

#[tokio::test]
async fn send_failure_prunes_client_from_registry() {
    let hub = hub();
    let failing = Arc::new(RecordingSink::new());
    failing.fail_sends();
    let id = hub.connect(failing).await;
    assert_eq!(hub.connected_count(), 1);

    hub.broadcast(None, serde_json::json!({"type": "pong"})).await;

    assert_eq!(hub.connected_count(), 0);
    assert!(!hub.is_subscribed(id, "all"));
}

/// A broadcast mid-send to a slow client must not block
/// concurrent subscribe/disconnect calls, and must eventually complete.
#[tokio::test]
async fn broadcast_under_mutation_does_not_deadlock() {
    let hub = Arc::new(hub());
    let slow = Arc::new(StallingSink::new());
    let other_sink = Arc::new(RecordingSink::new());

    let slow_id = hub.connect(slow.clone()).await;
    let other_id = hub.connect(other_sink.clone()).await;

    let hub_for_broadcast = hub.clone();
    let broadcast = tokio::spawn(async move {
        hub_for_broadcast.broadcast(None, serde_json::json!({"type": "job"})).await;
    });

    // Give the broadcast a chance to start collecting recipients and begin
    // sending before we mutate the registry concurrently.
    tokio::task::yield_now().await;

    let subscribe = tokio::time::timeout(
        Duration::from_secs(2),
        hub.subscribe(other_id, vec!["extra".to_string()]),
    )
    .await;
    assert!(subscribe.is_ok(), "subscribe must complete while a broadcast is mid-send");

    hub.disconnect(slow_id);
    assert_eq!(hub.connected_count(), 1);

    slow.release();
    tokio::time::timeout(Duration::from_secs(2), broadcast)
        .await
        .expect("broadcast must eventually complete")
        .unwrap();
}

#[tokio::test]
async fn unsubscribe_removes_topic() {
    let hub = hub();
    let sink = Arc::new(RecordingSink::new());
    let id = hub.connect(sink.clone()).await;
    hub.subscribe(id, vec!["jobs".to_string()]).await.unwrap();
    hub.unsubscribe(id, vec!["jobs".to_string()]).await.unwrap();

    hub.broadcast(Some("jobs".to_string()), serde_json::json!({"type": "job"})).await;
    assert!(!sink.frames().iter().any(|f| f["type"] == "job"));
}

#[tokio::test]
async fn subscribe_unknown_client_errors() {
    let hub = hub();
    let err = hub.subscribe(ClientId::new(), vec!["jobs".to_string()]).await.unwrap_err();
    assert!(matches!(err, WsError::NotConnected(_)));
}

#[tokio::test]
async fn broadcast_with_no_recipients_is_a_noop() {
    let hub = hub();
    hub.broadcast(Some("jobs".to_string()), serde_json::json!({"type": "job"})).await;
}
