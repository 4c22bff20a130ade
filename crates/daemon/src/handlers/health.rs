// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness and readiness. Unauthenticated, as these answer "is the
//! process up" and "can the process serve traffic", never "who are you".

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hvfleet_core::Clock;
use serde_json::json;

use crate::context::AppContext;

/// `env!` pulls in the build-time git hash `build.rs` stamps via
/// `cargo:rustc-env`; `unknown` only shows up when building outside git
/// (e.g. from a source tarball).
fn build_identifier() -> &'static str {
    env!("BUILD_GIT_HASH")
}

pub async fn healthz(State(context): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "build": build_identifier(),
        "timestamp": context.clock.now_utc(),
    }))
}

/// 503 until the inventory service completes its first refresh cycle.
/// There is no separate `config_error` state to report here — a daemon
/// that failed config validation never gets far enough to bind this
/// router at all (see `main`'s startup sequencing).
pub async fn readyz(State(context): State<Arc<AppContext>>) -> impl IntoResponse {
    if context.inventory.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "starting" })))
    }
}
