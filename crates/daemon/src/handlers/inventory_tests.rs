use axum::http::StatusCode;

use crate::test_support::{assert_status, dummy_context, get, json_body, send};

#[tokio::test]
async fn get_inventory_returns_cluster_hosts_and_vms() {
    let context = dummy_context();
    context.inventory.refresh_cycle().await;

    let response = send(context, get("/api/v1/inventory")).await;
    assert_status(&response, StatusCode::OK);
    let body = json_body(response).await;
    assert!(body.get("cluster").is_some());
    assert!(body.get("hosts").is_some());
    assert!(body.get("vms").is_some());
}

#[tokio::test]
async fn list_hosts_reflects_configured_fleet() {
    let context = dummy_context();
    context.inventory.refresh_cycle().await;

    let response = send(context, get("/api/v1/hosts")).await;
    assert_status(&response, StatusCode::OK);
    let body = json_body(response).await;
    let hosts = body.as_array().expect("hosts is an array");
    assert!(hosts.iter().any(|h| h["hostname"] == "test-host-1"));
}

#[tokio::test]
async fn get_host_404s_for_unknown_hostname() {
    let context = dummy_context();
    context.inventory.refresh_cycle().await;

    let response = send(context, get("/api/v1/hosts/does-not-exist")).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_vm_by_id_404s_when_missing() {
    let context = dummy_context();
    let response = send(context, get("/api/v1/vms/by-id/not-a-real-id")).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}
