// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binds every route this daemon serves onto one [`axum::Router`]. Auth is
//! enforced inside each handler (via the [`crate::auth_extract::Identity`]
//! extractor plus a `user.require(Permission)` guard) rather than as a
//! separate middleware layer, so the permission each route needs is
//! visible right next to the handler that needs it.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::handlers::{auth, health, inventory, jobs, notifications, ws};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_router(context: Arc<AppContext>) -> Router {
    let api = Router::new()
        .route("/inventory", get(inventory::get_inventory))
        .route("/hosts", get(inventory::list_hosts))
        .route("/hosts/{hostname}", get(inventory::get_host))
        .route("/hosts/{hostname}/vms", get(inventory::list_host_vms))
        .route("/vms", get(inventory::list_vms))
        .route("/vms/{hostname}/{name}", get(inventory::get_vm))
        .route("/vms/by-id/{vm_id}", get(inventory::get_vm_by_id))
        .route("/vms/create", post(jobs::create_vm))
        .route("/vms/delete", post(jobs::delete_vm))
        .route("/deployments", post(jobs::create_deployment))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", get(jobs::get_job))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread", get(notifications::list_unread))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read));

    let auth_routes = Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/token", get(auth::token))
        .route("/logout", post(auth::logout));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/ws", get(ws::upgrade))
        .nest("/api/v1", api)
        .nest("/auth", auth_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .with_state(context)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
