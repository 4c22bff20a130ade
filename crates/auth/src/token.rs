// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token validation against a JWKS-backed key source.

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::Value;

use crate::error::AuthError;
use crate::jwks::{JwksCache, JwksFetcher, ReqwestJwksFetcher};

/// Validates JWTs issued by one OIDC issuer: signature against the JWKS
/// cache, then issuer/audience/expiration/max-age.
pub struct JwtValidator<F: JwksFetcher = ReqwestJwksFetcher> {
    jwks: JwksCache<F>,
    issuer: String,
    audience: String,
    allowed_algorithms: Vec<Algorithm>,
    max_token_age: chrono::Duration,
}

impl<F: JwksFetcher> JwtValidator<F> {
    pub fn new(
        jwks: JwksCache<F>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        allowed_algorithms: Vec<Algorithm>,
        max_token_age: chrono::Duration,
    ) -> Self {
        Self { jwks, issuer: issuer.into(), audience: audience.into(), allowed_algorithms, max_token_age }
    }

    /// Decodes and fully validates `token`, returning its claims. Rejects
    /// `none` and any algorithm outside [`Self::allowed_algorithms`] before
    /// ever touching the key cache, so algorithm-confusion attacks never
    /// reach signature verification with an attacker-chosen algorithm.
    pub async fn validate(&self, token: &str) -> Result<Value, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        if !self.allowed_algorithms.contains(&header.alg) {
            return Err(AuthError::DisallowedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| AuthError::MalformedToken("token header is missing `kid`".into()))?;
        let key = self.jwks.get_key(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let decoded = decode::<Value>(token, &key, &validation).map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidIssuer => AuthError::InvalidToken("unexpected issuer".into()),
                ErrorKind::InvalidAudience => AuthError::InvalidToken("unexpected audience".into()),
                _ => AuthError::InvalidToken(err.to_string()),
            }
        })?;

        if exceeds_max_age(&decoded.claims, self.max_token_age, chrono::Utc::now()) {
            return Err(AuthError::TokenExpired);
        }
        Ok(decoded.claims)
    }
}

/// Bounds `iat` drift: a token issued further in the past than
/// `max_token_age` is rejected even if its own `exp` would still permit
/// it, guarding against long-lived tokens minted before a policy change.
/// A claims object with no `iat` (or an unparseable one) is never rejected
/// on this basis — `exp` alone governs that case.
fn exceeds_max_age(claims: &Value, max_token_age: chrono::Duration, now: chrono::DateTime<chrono::Utc>) -> bool {
    let Some(iat) = claims.get("iat").and_then(Value::as_i64) else {
        return false;
    };
    let Some(issued_at) = chrono::DateTime::from_timestamp(iat, 0) else {
        return false;
    };
    now.signed_duration_since(issued_at) > max_token_age
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
