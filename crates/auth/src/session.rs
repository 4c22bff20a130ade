// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-cookie identity: a lighter-weight alternative to re-validating
//! a bearer token on every request, for callers that went through an
//! interactive login flow.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AuthError;

/// What gets serialized into the session cookie's payload: the claims
/// resolved at login time, plus the instant login happened so the session
/// can be aged out independently of the original token's own expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub claims: Value,
    pub auth_timestamp: DateTime<Utc>,
}

impl SessionIdentity {
    pub fn new(claims: Value, auth_timestamp: DateTime<Utc>) -> Self {
        Self { claims, auth_timestamp }
    }

    /// Rejects a session older than `max_age`. The caller clears the
    /// cookie on an `Err` — this type never mutates itself to do so since
    /// cookie storage is the HTTP layer's concern, not this core's.
    pub fn check_max_age(&self, max_age: Duration, now: DateTime<Utc>) -> Result<(), AuthError> {
        if now.signed_duration_since(self.auth_timestamp) > max_age {
            return Err(AuthError::SessionExpired);
        }
        Ok(())
    }
}
