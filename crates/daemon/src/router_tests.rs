use axum::http::StatusCode;

use crate::test_support::{assert_status, dummy_context, get, json_body, send};

#[tokio::test]
async fn healthz_reports_ok_without_authentication() {
    let context = dummy_context();
    let response = send(context, get("/healthz")).await;
    assert_status(&response, StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["build"].is_string());
}

#[tokio::test]
async fn readyz_is_not_ready_before_the_first_refresh() {
    let context = dummy_context();
    let response = send(context, get("/readyz")).await;
    assert_status(&response, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn readyz_is_ready_after_a_refresh_cycle() {
    let context = dummy_context();
    context.inventory.refresh_cycle().await;
    let response = send(context, get("/readyz")).await;
    assert_status(&response, StatusCode::OK);
}

#[tokio::test]
async fn unknown_routes_404() {
    let context = dummy_context();
    let response = send(context, get("/not-a-real-route")).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}
