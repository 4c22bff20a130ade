// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Identity` extractor: resolves an [`AuthenticatedUser`] from
//! whichever credential a request carries (bearer token, session cookie,
//! or — with auth disabled — the fixed development identity), so
//! handlers only ever call [`AuthenticatedUser::require`] on something
//! already resolved.
//!
//! No `base64` crate is in this workspace's dependency tree and none is
//! worth adding for one cookie value, so the session cookie is a
//! hex-encoded JSON blob instead — hex avoids every character
//! `Set-Cookie` treats specially (`;`, `,`, quotes) without pulling in a
//! new dependency.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};

use hvfleet_auth::{AuthError, AuthenticatedUser, SessionIdentity};

use crate::context::AppContext;
use crate::error::ApiError;

pub const SESSION_COOKIE_NAME: &str = "hvfleet_session";

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

pub fn encode_session_cookie(session: &SessionIdentity) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(session)?;
    Ok(hex_encode(&json))
}

fn decode_session_cookie(value: &str) -> Option<SessionIdentity> {
    let bytes = hex_decode(value)?;
    serde_json::from_slice(&bytes).ok()
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

/// Extracts the authenticated identity for the current request. Route
/// handlers that need write access still call
/// `identity.0.require(Permission::Writer)` themselves — this extractor
/// only resolves *who*, never *what they're allowed to do*.
pub struct Identity(pub AuthenticatedUser);

impl FromRequestParts<Arc<AppContext>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppContext>) -> Result<Self, Self::Rejection> {
        let auth = &state.auth;

        if let Some(token) = bearer_token(&parts.headers) {
            return Ok(Identity(auth.authenticate_bearer(token).await?));
        }

        if let Some(cookie) = read_cookie(&parts.headers, SESSION_COOKIE_NAME) {
            let session = decode_session_cookie(&cookie)
                .ok_or_else(|| ApiError::from(AuthError::MalformedToken("session cookie was not valid".into())))?;
            return Ok(Identity(auth.authenticate_session(&session)?));
        }

        if !auth.auth_enabled() {
            return Ok(Identity(auth.authenticate_bearer("").await?));
        }

        Err(ApiError::from(AuthError::MissingCredential))
    }
}

pub fn unauthorized(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, message)
}
