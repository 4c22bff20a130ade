// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for handler/router tests: a fake-backed [`AppContext`]
//! wired exactly like `main` does for `--dummy-data`, just without a real
//! listener.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response, StatusCode};
use hvfleet_core::Settings;
use serde_json::Value;
use tower::ServiceExt;

use crate::context::AppContext;
use crate::router::build_router;

/// Auth disabled, dummy data enabled. Every request resolves to the fixed
/// admin-role dev identity, so handler tests can exercise each route
/// without standing up an OIDC provider.
pub fn dummy_context() -> Arc<AppContext> {
    let mut settings = Settings::default();
    settings.dummy_data = true;
    settings.auth_enabled = false;
    settings.hyperv_hosts = vec!["test-host-1".to_string()];
    AppContext::build(settings)
}

/// Same as [`dummy_context`] but with auth enabled and a static API token,
/// for the permission-boundary tests that need a non-dev identity whose
/// role is controllable per test.
pub fn authed_context(api_token: &str) -> Arc<AppContext> {
    let mut settings = Settings::default();
    settings.dummy_data = true;
    settings.auth_enabled = true;
    settings.api_token = Some(api_token.to_string());
    settings.allow_dev_auth = false;
    settings.hyperv_hosts = vec!["test-host-1".to_string()];
    AppContext::build(settings)
}

pub async fn send(context: Arc<AppContext>, request: Request<Body>) -> Response<Body> {
    build_router(context).oneshot(request).await.expect("router is infallible")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request builds")
}

pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request builds")
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub fn post_json_with_bearer(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status code");
}
