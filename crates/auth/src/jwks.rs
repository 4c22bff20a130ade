// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JWKS fetch and cache, with stale-on-error fallback and single-flight
//! refresh.
//!
//! A miss on `kid` triggers a forced refresh so key rotation is picked up
//! without waiting for the TTL, but a minimum refresh interval keeps a
//! burst of unknown-`kid` lookups (an attacker fishing for a cache-busting
//! storm, or just a slow rollout) from hammering the issuer. See
//! [`JwksCache::get_key`].

use std::collections::HashMap;
use std::time::Duration;

use hvfleet_core::Clock;
use jsonwebtoken::DecodingKey;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::AuthError;

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: Option<String>,
    e: Option<String>,
    #[serde(rename = "x5c")]
    x5c: Option<Vec<String>>,
}

#[derive(Clone)]
struct CachedKey {
    decoding_key: DecodingKey,
}

impl CachedKey {
    fn from_jwk(jwk: &Jwk) -> Option<Self> {
        match jwk.kty.as_str() {
            "RSA" => {
                let n = jwk.n.as_deref()?;
                let e = jwk.e.as_deref()?;
                DecodingKey::from_rsa_components(n, e).ok().map(|decoding_key| Self { decoding_key })
            }
            "EC" if jwk.x5c.is_some() => {
                let cert = jwk.x5c.as_ref()?.first()?;
                DecodingKey::from_ec_der(cert.as_bytes()).ok().map(|decoding_key| Self { decoding_key })
            }
            _ => None,
        }
    }
}

/// Fetches a JWKS document over the wire. Abstracted so tests can supply a
/// fake without hitting real network.
#[async_trait::async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, AuthError>;
}

/// The production fetcher: a plain GET with `reqwest`.
pub struct ReqwestJwksFetcher {
    client: reqwest::Client,
}

impl ReqwestJwksFetcher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for ReqwestJwksFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JwksFetcher for ReqwestJwksFetcher {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, AuthError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| AuthError::JwksFetch { url: url.to_string(), source })?;
        let body = response
            .error_for_status()
            .map_err(|source| AuthError::JwksFetch { url: url.to_string(), source })?
            .json::<serde_json::Value>()
            .await
            .map_err(|source| AuthError::JwksFetch { url: url.to_string(), source })?;
        Ok(body)
    }
}

struct CacheInner {
    keys: HashMap<String, CachedKey>,
    last_refresh: Option<std::time::Instant>,
    last_refresh_attempt: Option<std::time::Instant>,
    ever_succeeded: bool,
}

impl CacheInner {
    fn empty() -> Self {
        Self { keys: HashMap::new(), last_refresh: None, last_refresh_attempt: None, ever_succeeded: false }
    }
}

fn is_stale(last_refresh: Option<std::time::Instant>, ttl: Duration, now: std::time::Instant) -> bool {
    match last_refresh {
        None => true,
        Some(at) => now.saturating_duration_since(at) >= ttl,
    }
}

fn can_attempt(last_attempt: Option<std::time::Instant>, min_interval: Duration, now: std::time::Instant) -> bool {
    match last_attempt {
        None => true,
        Some(at) => now.saturating_duration_since(at) >= min_interval,
    }
}

/// Caches the decoding keys fetched from one issuer's JWKS endpoint.
///
/// `ttl` governs routine staleness; `min_refresh_interval` throttles the
/// forced refresh a `kid` miss triggers. A fetch failure never clears the
/// existing key set — [`Self::get_key`] keeps serving the last known good
/// keys until a refresh actually succeeds.
pub struct JwksCache<F: JwksFetcher = ReqwestJwksFetcher> {
    url: String,
    ttl: Duration,
    min_refresh_interval: Duration,
    fetcher: F,
    inner: RwLock<CacheInner>,
    refresh_lock: Mutex<()>,
}

impl<F: JwksFetcher> JwksCache<F> {
    pub fn new(url: impl Into<String>, ttl: Duration, min_refresh_interval: Duration, fetcher: F) -> Self {
        Self {
            url: url.into(),
            ttl,
            min_refresh_interval,
            fetcher,
            inner: RwLock::new(CacheInner::empty()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Resolve a decoding key for `kid`. Refreshes first if the cache is
    /// stale or never populated; on a miss after that, forces one more
    /// refresh (subject to the minimum-interval throttle) before giving up.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if is_stale(self.inner.read().await.last_refresh, self.ttl, std::time::Instant::now()) {
            self.try_refresh(false).await;
        }
        if let Some(key) = self.inner.read().await.keys.get(kid) {
            return Ok(key.decoding_key.clone());
        }
        self.try_refresh(true).await;
        self.inner
            .read()
            .await
            .keys
            .get(kid)
            .map(|key| key.decoding_key.clone())
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }

    /// Single-flight refresh: the first caller to acquire `refresh_lock`
    /// performs the fetch; everyone else blocks on the lock, then observes
    /// whatever that fetch left behind rather than issuing their own.
    async fn try_refresh(&self, force: bool) {
        let _guard = self.refresh_lock.lock();
        let now = std::time::Instant::now();
        {
            let guard = self.inner.read().await;
            if !force && !is_stale(guard.last_refresh, self.ttl, now) {
                return;
            }
            if !can_attempt(guard.last_refresh_attempt, self.min_refresh_interval, now) {
                return;
            }
        }
        self.inner.write().await.last_refresh_attempt = Some(now);

        match self.fetcher.fetch(&self.url).await {
            Ok(body) => match serde_json::from_value::<JwksResponse>(body) {
                Ok(parsed) => {
                    let keys: HashMap<String, CachedKey> = parsed
                        .keys
                        .iter()
                        .filter_map(|jwk| CachedKey::from_jwk(jwk).map(|key| (jwk.kid.clone(), key)))
                        .collect();
                    let mut guard = self.inner.write().await;
                    guard.keys = keys;
                    guard.last_refresh = Some(now);
                    guard.ever_succeeded = true;
                }
                Err(err) => warn!(url = %self.url, error = %err, "jwks response did not match expected shape"),
            },
            Err(err) => warn!(url = %self.url, error = %err, "jwks refresh failed, serving stale key set"),
        }
    }

    pub async fn has_ever_succeeded(&self) -> bool {
        self.inner.read().await.ever_succeeded
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A fetcher that returns a fixed JWKS document, or fails when told to,
    /// and counts how many times it was called — enough to assert
    /// single-flight behavior and force-refresh-on-miss in tests.
    pub struct FakeJwksFetcher {
        pub body: parking_lot::Mutex<serde_json::Value>,
        pub fail: std::sync::atomic::AtomicBool,
        pub calls: AtomicUsize,
    }

    impl FakeJwksFetcher {
        pub fn new(body: serde_json::Value) -> Self {
            Self { body: parking_lot::Mutex::new(body), fail: std::sync::atomic::AtomicBool::new(false), calls: AtomicUsize::new(0) }
        }

        pub fn set_body(&self, body: serde_json::Value) {
            *self.body.lock() = body;
        }

        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl JwksFetcher for FakeJwksFetcher {
        async fn fetch(&self, url: &str) -> Result<serde_json::Value, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(AuthError::JwksUnavailable);
            }
            let _ = url;
            Ok(self.body.lock().clone())
        }
    }
}

#[cfg(test)]
#[path = "jwks_tests.rs"]
mod tests;
