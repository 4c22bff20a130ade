// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The OIDC authorization-code flow endpoints (`login`/`callback`) and the
//! two session utility endpoints (`token`/`logout`).
//!
//! There is no server-side session store (see this workspace's "persisted
//! state: none" constraint), so the post-login redirect target travels
//! round-trip inside the OAuth `state` parameter itself rather than in a
//! stashed server-side record — the hex encoding already used for the
//! session cookie does double duty here.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use hvfleet_auth::SessionIdentity;
use serde::Deserialize;
use serde_json::json;

use crate::auth_extract::{encode_session_cookie, hex_decode, hex_encode, Identity, SESSION_COOKIE_NAME};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::oidc_client;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub redirect: Option<String>,
}

fn oidc_client_settings(context: &AppContext) -> Result<(String, String, Option<String>, String), ApiError> {
    let issuer = context.settings.oidc_issuer_url.clone().ok_or_else(|| ApiError::bad_request("OIDC is not configured"))?;
    let client_id = context.settings.oidc_client_id.clone().ok_or_else(|| ApiError::bad_request("OIDC is not configured"))?;
    let redirect_uri =
        context.settings.oidc_redirect_uri.clone().ok_or_else(|| ApiError::bad_request("oidc_redirect_uri is not configured"))?;
    Ok((issuer, client_id, context.settings.oidc_client_secret.clone(), redirect_uri))
}

pub async fn login(State(context): State<Arc<AppContext>>, Query(query): Query<LoginQuery>) -> Result<Response, ApiError> {
    let (issuer, client_id, _secret, redirect_uri) = oidc_client_settings(&context)?;
    let client = reqwest::Client::new();
    let discovery = oidc_client::discover(&client, &issuer)
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()))?;

    let state = hex_encode(query.redirect.unwrap_or_else(|| "/".to_string()).as_bytes());
    let url = oidc_client::authorize_url(&discovery, &client_id, &redirect_uri, &state);
    Ok(Redirect::temporary(&url).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    #[serde(default)]
    pub state: Option<String>,
}

pub async fn callback(State(context): State<Arc<AppContext>>, Query(query): Query<CallbackQuery>) -> Result<Response, ApiError> {
    let (issuer, client_id, client_secret, redirect_uri) = oidc_client_settings(&context)?;
    let client = reqwest::Client::new();
    let discovery = oidc_client::discover(&client, &issuer)
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()))?;

    let token = oidc_client::exchange_code(&client, &discovery.token_endpoint, &query.code, &redirect_uri, &client_id, client_secret.as_deref())
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()))?;

    let user = context.auth.authenticate_bearer(&token.access_token).await?;
    let session = SessionIdentity::new(user.claims.clone(), context.clock.now_utc());
    let cookie_value = encode_session_cookie(&session).map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let redirect_target = query
        .state
        .as_deref()
        .and_then(hex_decode)
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| "/".to_string());

    let cookie = format!("{SESSION_COOKIE_NAME}={cookie_value}; Path=/; HttpOnly; SameSite=Lax");
    Ok((StatusCode::SEE_OTHER, [(header::SET_COOKIE, cookie), (header::LOCATION, redirect_target)], ()).into_response())
}

pub async fn token(Identity(user): Identity) -> impl IntoResponse {
    Json(json!({
        "subject": user.subject,
        "email": user.email,
        "roles": user.roles,
        "identity_type": format!("{:?}", user.identity_type),
    }))
}

pub async fn logout() -> impl IntoResponse {
    let cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; Max-Age=0");
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(json!({ "logged_out": true })))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
