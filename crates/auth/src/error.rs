// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors the auth core can raise while resolving a request's identity.
/// Every variant maps to a 401 or 403 at the HTTP layer; nothing here is a
/// 5xx except [`AuthError::JwksUnavailable`], which fires only when a JWKS
/// endpoint has never once been reached.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential was presented")]
    MissingCredential,
    #[error("malformed bearer token: {0}")]
    MalformedToken(String),
    #[error("token signature or claims failed validation: {0}")]
    InvalidToken(String),
    #[error("token has expired")]
    TokenExpired,
    #[error("token algorithm `{0}` is not in the allow-list")]
    DisallowedAlgorithm(String),
    #[error("no signing key found for kid `{0}`")]
    UnknownKeyId(String),
    #[error("jwks fetch from `{url}` failed: {source}")]
    JwksFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("jwks endpoint has never been reachable")]
    JwksUnavailable,
    #[error("session has expired")]
    SessionExpired,
    #[error("oidc validation was requested but no issuer is configured")]
    OidcNotConfigured,
    #[error("identity lacks required permission `{required}`")]
    InsufficientPermission { required: &'static str },
}
