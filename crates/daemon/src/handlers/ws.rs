// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `/ws` upgrade handler and the [`ClientSink`] adapter wrapping
//! axum's WebSocket split-sink.
//!
//! The sink side is a bounded mpsc channel rather than writing directly to
//! the socket from [`ClientSink::send`] — `send` takes `&self` but axum's
//! `SplitSink` needs `&mut self`, so a dedicated writer task owns the real
//! sink and this adapter only ever pushes onto its channel. The channel's
//! bound is what gives [`hvfleet_ws::WsHub`]'s per-send timeout real teeth:
//! a stalled client's queue fills, and the bounded `send().await` blocks
//! until the hub's `tokio::time::timeout` gives up on it.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use hvfleet_core::Clock;
use hvfleet_ws::{frames, ClientId, ClientSink};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::context::AppContext;

const OUTBOUND_QUEUE_DEPTH: usize = 32;

struct AxumClientSink {
    tx: mpsc::Sender<Value>,
}

#[async_trait]
impl ClientSink for AxumClientSink {
    async fn send(&self, message: Value) -> Result<(), String> {
        self.tx.send(message).await.map_err(|_| "client writer task has stopped".to_string())
    }
}

pub async fn upgrade(State(context): State<Arc<AppContext>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

async fn handle_socket(socket: WebSocket, context: Arc<AppContext>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Value>(OUTBOUND_QUEUE_DEPTH);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    let client_id = context.ws_hub.connect(Arc::new(AxumClientSink { tx: tx.clone() })).await;
    debug!(client_id = %client_id, "websocket client connected");

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => handle_frame(&context, client_id, &tx, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    context.ws_hub.disconnect(client_id);
    drop(tx);
    let _ = writer.await;
    debug!(client_id = %client_id, "websocket client disconnected");
}

async fn handle_frame(context: &Arc<AppContext>, client_id: ClientId, tx: &mpsc::Sender<Value>, text: &str) {
    let Ok(frame) = serde_json::from_str::<Value>(text) else {
        warn!(client_id = %client_id, "dropping malformed websocket frame");
        return;
    };
    let topics = |frame: &Value| -> Vec<String> {
        frame
            .get("topics")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    match frame.get("type").and_then(Value::as_str) {
        Some("subscribe") => {
            let _ = context.ws_hub.subscribe(client_id, topics(&frame)).await;
        }
        Some("unsubscribe") => {
            let _ = context.ws_hub.unsubscribe(client_id, topics(&frame)).await;
        }
        Some("ping") => {
            let _ = tx.send(frames::pong_frame(context.clock.now_utc())).await;
        }
        other => {
            warn!(client_id = %client_id, frame_type = ?other, "ignoring unrecognized websocket frame type");
        }
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
