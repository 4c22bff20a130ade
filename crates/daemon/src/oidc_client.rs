// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client side of the OIDC authorization-code flow: discovery
//! document lookup and the code→token exchange `/auth/callback` drives.
//!
//! [`hvfleet_auth::AuthCore`] owns JWKS caching and token *validation*;
//! this module is the thin, HTTP-specific piece that gets a token in the
//! first place, which is why it lives in the daemon binary rather than
//! the transport-agnostic auth crate (see that crate's module docs).

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum OidcClientError {
    #[error("OIDC is not configured (oidc_issuer_url is unset)")]
    NotConfigured,
    #[error("failed to fetch discovery document from {url}: {source}")]
    Discovery { url: String, source: reqwest::Error },
    #[error("discovery document from {issuer} was malformed: {source}")]
    MalformedDiscovery { issuer: String, source: reqwest::Error },
    #[error("token exchange with {url} failed: {source}")]
    TokenExchange { url: String, source: reqwest::Error },
    #[error("token endpoint at {url} returned {status}: {body}")]
    TokenEndpointError { url: String, status: reqwest::StatusCode, body: String },
}

/// The subset of a `.well-known/openid-configuration` document this
/// daemon needs to drive the browser through the authorization-code
/// flow. Every other field the real document carries is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcDiscovery {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
}

/// Fetches and parses `{issuer}/.well-known/openid-configuration`. No
/// caching here — unlike the JWKS keyset this is only hit twice per
/// login (once to build the redirect, once to resolve the token
/// endpoint for the callback's exchange), so a cache would add
/// complexity without a measurable win.
pub async fn discover(client: &reqwest::Client, issuer: &str) -> Result<OidcDiscovery, OidcClientError> {
    let url = format!("{}/.well-known/openid-configuration", issuer.trim_end_matches('/'));
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|source| OidcClientError::Discovery { url: url.clone(), source })?;
    response
        .error_for_status()
        .map_err(|source| OidcClientError::Discovery { url: url.clone(), source })?
        .json::<OidcDiscovery>()
        .await
        .map_err(|source| OidcClientError::MalformedDiscovery { issuer: issuer.to_string(), source })
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Exchanges an authorization `code` for tokens at `token_endpoint`,
/// using the standard `authorization_code` grant form encoding.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_endpoint: &str,
    code: &str,
    redirect_uri: &str,
    client_id: &str,
    client_secret: Option<&str>,
) -> Result<TokenResponse, OidcClientError> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", client_id),
    ];
    if let Some(secret) = client_secret {
        form.push(("client_secret", secret));
    }

    let response = client
        .post(token_endpoint)
        .form(&form)
        .send()
        .await
        .map_err(|source| OidcClientError::TokenExchange { url: token_endpoint.to_string(), source })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(OidcClientError::TokenEndpointError { url: token_endpoint.to_string(), status, body });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|source| OidcClientError::TokenExchange { url: token_endpoint.to_string(), source })
}

/// Builds the `authorization_endpoint?...` redirect target the browser is
/// sent to for `/auth/login`.
pub fn authorize_url(discovery: &OidcDiscovery, client_id: &str, redirect_uri: &str, state: &str) -> String {
    let scope = "openid profile email";
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        discovery.authorization_endpoint,
        urlencoding_component(client_id),
        urlencoding_component(redirect_uri),
        urlencoding_component(scope),
        urlencoding_component(state),
    )
}

/// A minimal percent-encoder for the handful of characters that show up
/// in the query-string values we build here (spaces, colons, slashes).
/// No `url`/`percent-encoding` crate is in this workspace's dependency
/// tree, and pulling one in for five reserved characters isn't worth it.
fn urlencoding_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
