// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure builders for the server→client frames the hub itself is
//! responsible for (connection handshake, subscription acks, pong). The
//! `job` and `notification` frame shapes are built by their owning
//! services (`hvfleet-jobs`, `hvfleet-notify`) since only they know the
//! payload; this module only covers frames that originate in the hub.

use chrono::{DateTime, Utc};

use crate::client::ClientId;

pub fn connection_frame(client_id: ClientId, now: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "type": "connection",
        "status": "connected",
        "client_id": client_id,
        "timestamp": now,
    })
}

pub fn subscription_frame(status: &str, topics: &[String]) -> serde_json::Value {
    serde_json::json!({
        "type": "subscription",
        "status": status,
        "topics": topics,
    })
}

pub fn pong_frame(now: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "type": "pong",
        "timestamp": now,
    })
}
