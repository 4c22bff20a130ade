// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single entry point the HTTP layer calls to resolve a request's
//! identity, whichever of the four credential paths it arrives on:
//! bearer JWT, session cookie, static API token, or (when auth is
//! disabled) dev mode.

use std::collections::HashSet;
use std::sync::Once;

use chrono::Duration as ChronoDuration;
use hvfleet_core::{Clock, Settings, SystemClock};
use jsonwebtoken::Algorithm;
use tracing::warn;

use crate::error::AuthError;
use crate::identity::AuthenticatedUser;
use crate::jwks::{JwksCache, JwksFetcher, ReqwestJwksFetcher};
use crate::roles::{self, RoleExtractor};
use crate::session::SessionIdentity;
use crate::token::JwtValidator;

static DEV_MODE_WARNING: Once = Once::new();

fn allowed_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512, Algorithm::ES256, Algorithm::ES384]
}

/// Resolves the identity for any credential the API surface accepts. See
/// module docs for the four paths this dispatches across.
pub struct AuthCore<C: Clock = SystemClock, F: JwksFetcher = ReqwestJwksFetcher, R: RoleExtractor = roles::DefaultRoleExtractor> {
    clock: C,
    validator: Option<JwtValidator<F>>,
    role_extractor: R,
    legacy_role: Option<String>,
    auth_enabled: bool,
    api_token: Option<String>,
    default_role: String,
    session_max_age: ChronoDuration,
}

impl<C: Clock> AuthCore<C, ReqwestJwksFetcher, roles::DefaultRoleExtractor> {
    /// Builds the production core from [`Settings`]. `oidc_role_name` (when
    /// set) becomes the legacy single-role alias described in
    /// [`crate::identity::compute_permissions`].
    pub fn from_settings(clock: C, settings: &Settings) -> Self {
        let validator = settings.oidc_issuer_url.as_ref().map(|issuer| {
            let jwks_url = format!("{}/protocol/openid-connect/certs", issuer.trim_end_matches('/'));
            let jwks = JwksCache::new(
                jwks_url,
                std::time::Duration::from_secs(settings.jwks_cache_ttl_secs),
                std::time::Duration::from_secs(5),
                ReqwestJwksFetcher::new(),
            );
            let audience = settings.oidc_client_id.clone().unwrap_or_default();
            JwtValidator::new(
                jwks,
                issuer.clone(),
                audience,
                allowed_algorithms(),
                ChronoDuration::seconds(settings.max_token_age_secs as i64),
            )
        });
        Self {
            clock,
            validator,
            role_extractor: roles::default_role_extractor(),
            legacy_role: settings.oidc_role_name.clone(),
            auth_enabled: settings.auth_enabled,
            api_token: settings.api_token.clone(),
            default_role: settings.oidc_role_name.clone().unwrap_or_else(|| "admin".to_string()),
            session_max_age: ChronoDuration::seconds(settings.session_max_age_secs as i64),
        }
    }
}

impl<C: Clock, F: JwksFetcher, R: RoleExtractor> AuthCore<C, F, R> {
    /// Resolve an identity from an `Authorization: Bearer <token>` value
    /// (without the `Bearer ` prefix). Tries the static API token first
    /// (a plain equality check, never a JWT decode), then falls through to
    /// OIDC token validation.
    pub async fn authenticate_bearer(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if !self.auth_enabled {
            return Ok(self.dev_identity());
        }
        if let Some(configured) = &self.api_token {
            if !configured.is_empty() && configured == token {
                return Ok(self.api_token_identity());
            }
        }
        let validator = self.validator.as_ref().ok_or(AuthError::OidcNotConfigured)?;
        let claims = validator.validate(token).await?;
        let roles = self.role_extractor.extract(&claims);
        Ok(AuthenticatedUser::from_claims(claims, roles, self.legacy_role.as_deref()))
    }

    /// Resolve an identity from a previously-established session. Rejects
    /// (and the caller clears) a session older than `session_max_age_secs`.
    pub fn authenticate_session(&self, session: &SessionIdentity) -> Result<AuthenticatedUser, AuthError> {
        if !self.auth_enabled {
            return Ok(self.dev_identity());
        }
        session.check_max_age(self.session_max_age, self.clock.now_utc())?;
        let roles = self.role_extractor.extract(&session.claims);
        Ok(AuthenticatedUser::from_claims(session.claims.clone(), roles, self.legacy_role.as_deref()))
    }

    /// The fixed identity every request resolves to when authentication is
    /// disabled. Logs a warning exactly once per process so dev mode is
    /// never silently mistaken for production.
    fn dev_identity(&self) -> AuthenticatedUser {
        DEV_MODE_WARNING.call_once(|| {
            warn!("authentication is disabled; every request resolves to a fixed development identity");
        });
        AuthenticatedUser::from_claims(
            serde_json::json!({ "sub": "dev-user" }),
            HashSet::from([self.default_role.clone()]),
            self.legacy_role.as_deref(),
        )
    }

    fn api_token_identity(&self) -> AuthenticatedUser {
        AuthenticatedUser::from_claims(
            serde_json::json!({ "sub": "api-token", "idtyp": "app" }),
            HashSet::from([self.default_role.clone()]),
            self.legacy_role.as_deref(),
        )
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
