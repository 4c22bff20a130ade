// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`ClientSink`] boundary: everything below it (the actual axum
//! WebSocket split-sink, the socket write itself) is a real production
//! concern the hub only ever reaches through this trait, mirroring the way
//! `hvfleet-transport::Session` keeps the hub testable without a real
//! socket.

use async_trait::async_trait;
use hvfleet_core::define_uuid_id;

define_uuid_id! {
    /// Identifies one connected WebSocket client for the lifetime of its
    /// connection. Echoed back in the `connection` frame on connect.
    pub struct ClientId;
}

/// A single outbound frame destination. One implementation per connected
/// socket; the hub never knows or cares what's on the other side.
#[async_trait]
pub trait ClientSink: Send + Sync + 'static {
    /// Deliver one JSON frame. An `Err` return schedules the client for
    /// disconnect — the hub does not retry a failed send.
    async fn send(&self, message: serde_json::Value) -> Result<(), String>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every frame sent to it; can be told to fail future sends to
    /// exercise the hub's prune-on-failure path.
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        state: Arc<Mutex<RecordingSinkState>>,
    }

    #[derive(Default)]
    struct RecordingSinkState {
        frames: Vec<serde_json::Value>,
        failing: bool,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_sends(&self) {
            self.state.lock().failing = true;
        }

        pub fn frames(&self) -> Vec<serde_json::Value> {
            self.state.lock().frames.clone()
        }
    }

    #[async_trait]
    impl ClientSink for RecordingSink {
        async fn send(&self, message: serde_json::Value) -> Result<(), String> {
            let mut state = self.state.lock();
            if state.failing {
                return Err("simulated send failure".to_string());
            }
            state.frames.push(message);
            Ok(())
        }
    }

    /// A sink that blocks until released, for exercising the hub's
    /// lock-release-before-send ordering under a slow client.
    #[derive(Clone)]
    pub struct StallingSink {
        gate: Arc<tokio::sync::Notify>,
    }

    impl StallingSink {
        pub fn new() -> Self {
            Self { gate: Arc::new(tokio::sync::Notify::new()) }
        }

        pub fn release(&self) {
            self.gate.notify_waiters();
        }
    }

    impl Default for StallingSink {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ClientSink for StallingSink {
        async fn send(&self, _message: serde_json::Value) -> Result<(), String> {
            self.gate.notified().await;
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
