use axum::http::StatusCode;

use crate::test_support::{assert_status, authed_context, get, get_with_bearer, json_body, send};

#[tokio::test]
async fn token_resolves_the_static_api_token_identity() {
    let context = authed_context("secret-token");
    let response = send(context, get_with_bearer("/auth/token", "secret-token")).await;
    assert_status(&response, StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["subject"], "api-token");
    assert_eq!(body["identity_type"], "ServicePrincipal");
}

#[tokio::test]
async fn token_rejects_a_missing_credential_when_auth_is_enabled() {
    let context = authed_context("secret-token");
    let response = send(context, get("/auth/token")).await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_rejects_the_wrong_bearer_value() {
    let context = authed_context("secret-token");
    let response = send(context, get_with_bearer("/auth/token", "wrong-token")).await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_400s_without_oidc_configured() {
    let context = authed_context("secret-token");
    let response = send(context, get("/auth/login")).await;
    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let context = authed_context("secret-token");
    let response = send(context, crate::test_support::post_json("/auth/logout", &serde_json::json!({}))).await;
    assert_status(&response, StatusCode::OK);
    let set_cookie = response.headers().get("set-cookie").expect("logout sets a cookie").to_str().expect("header is ascii");
    assert!(set_cookie.contains("Max-Age=0"));
}
