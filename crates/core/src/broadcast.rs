// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fan-out seam every service that publishes a WebSocket event depends
//! on, without depending on `hvfleet-ws` itself.
//!
//! The job service broadcasts `job` events to `jobs`/`jobs:{job_id}`; the
//! notification service broadcasts `notification` events to `notifications`.
//! Both take an `Arc<dyn Broadcaster>` rather than a concrete hub type, so
//! unit tests substitute an in-memory fake and the daemon binary is the only
//! place that wires the real `hvfleet-ws` hub in.

use async_trait::async_trait;

/// Fans a JSON message out to WebSocket subscribers of `topic` (or every
/// connected client when `topic` is `None`). Implementations must never
/// fail the call on a client's send error — per-client failures are the
/// hub's problem to log and clean up, not this trait's to propagate.
#[async_trait]
pub trait Broadcaster: Send + Sync + 'static {
    async fn broadcast(&self, topic: Option<String>, message: serde_json::Value);
}

/// Discards every message. Used by callers that don't care about WebSocket
/// fan-out (most service-level unit tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroadcaster;

#[async_trait]
impl Broadcaster for NullBroadcaster {
    async fn broadcast(&self, _topic: Option<String>, _message: serde_json::Value) {}
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every broadcast call for assertion in tests.
    #[derive(Clone, Default)]
    pub struct RecordingBroadcaster {
        calls: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
    }

    impl RecordingBroadcaster {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<(Option<String>, serde_json::Value)> {
            self.calls.lock().clone()
        }

        pub fn calls_for_topic(&self, topic: &str) -> Vec<serde_json::Value> {
            self.calls
                .lock()
                .iter()
                .filter(|(t, _)| t.as_deref() == Some(topic))
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Broadcaster for RecordingBroadcaster {
        async fn broadcast(&self, topic: Option<String>, message: serde_json::Value) {
            self.calls.lock().push((topic, message));
        }
    }
}
