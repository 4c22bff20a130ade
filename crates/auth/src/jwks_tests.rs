use super::*;
use crate::jwks::fake::FakeJwksFetcher;
use std::time::Duration;

fn rsa_jwk(kid: &str) -> serde_json::Value {
    serde_json::json!({
        "kid": kid,
        "kty": "RSA",
        "n": "sXchPAzPomHMiZsWsIfT1q1U3TDQYcu6kBT8wtGrYzeoEfkm6vhVv0vgl9GaKbYvWf4WxAjqTjCX31X6-jS0FCK8z2Kz5XMLtfzEhNhKUg9HuX6iOV_ChgDKpHE_c5evscxfZDaXnn7vz5hGD4UkzsDn1QgXZrU62mJp9KSa6SRJ5iWmOZvM6AGhtBd_peX1wl5iv_zh4ZSHipSQ2jt2t1wVaE2VdA3a1D12i_zpj4YVUJwxU1-93gtMaUpHRDKPtZvl_jIZByTDgjiE9hr2R0dxdDzazFJ6c8Eg8dF2SUpBQG3w",
        "e": "AQAB",
    })
}

fn jwks_doc(kids: &[&str]) -> serde_json::Value {
    serde_json::json!({ "keys": kids.iter().map(|kid| rsa_jwk(kid)).collect::<Vec<_>>() })
}

#[test]
fn is_stale_when_never_refreshed() {
    assert!(is_stale(None, Duration::from_secs(60), std::time::Instant::now()));
}

#[test]
fn is_stale_respects_ttl() {
    let now = std::time::Instant::now();
    assert!(!is_stale(Some(now), Duration::from_secs(60), now));
}

#[test]
fn can_attempt_when_never_attempted() {
    assert!(can_attempt(None, Duration::from_secs(5), std::time::Instant::now()));
}

#[test]
fn can_attempt_throttles_within_min_interval() {
    let now = std::time::Instant::now();
    assert!(!can_attempt(Some(now), Duration::from_secs(5), now));
}

#[tokio::test]
async fn get_key_fetches_on_first_use() {
    let fetcher = FakeJwksFetcher::new(jwks_doc(&["kid-1"]));
    let cache = JwksCache::new("https://issuer.example/jwks", Duration::from_secs(60), Duration::from_secs(1), fetcher);
    let key = cache.get_key("kid-1").await;
    assert!(key.is_ok());
    assert_eq!(cache.fetcher.call_count(), 1);
}

#[tokio::test]
async fn get_key_forces_refresh_on_unknown_kid() {
    let fetcher = FakeJwksFetcher::new(jwks_doc(&["kid-1"]));
    let cache = JwksCache::new("https://issuer.example/jwks", Duration::from_secs(3600), Duration::from_secs(0), fetcher);
    cache.get_key("kid-1").await.unwrap();
    assert_eq!(cache.fetcher.call_count(), 1);

    cache.fetcher.set_body(jwks_doc(&["kid-1", "kid-2"]));
    let rotated = cache.get_key("kid-2").await;
    assert!(rotated.is_ok());
    assert_eq!(cache.fetcher.call_count(), 2);
}

#[tokio::test]
async fn get_key_serves_stale_set_on_fetch_failure() {
    let fetcher = FakeJwksFetcher::new(jwks_doc(&["kid-1"]));
    let cache = JwksCache::new("https://issuer.example/jwks", Duration::from_secs(0), Duration::from_secs(0), fetcher);
    cache.get_key("kid-1").await.unwrap();

    cache.fetcher.set_fail(true);
    let still_good = cache.get_key("kid-1").await;
    assert!(still_good.is_ok(), "stale-on-error must keep serving the last known good set");
}

#[tokio::test]
async fn get_key_fails_when_never_populated() {
    let fetcher = FakeJwksFetcher::new(jwks_doc(&[]));
    fetcher.set_fail(true);
    let cache = JwksCache::new("https://issuer.example/jwks", Duration::from_secs(60), Duration::from_secs(0), fetcher);
    let result = cache.get_key("kid-1").await;
    assert!(matches!(result, Err(AuthError::UnknownKeyId(_))));
    assert!(!cache.has_ever_succeeded().await);
}

#[tokio::test]
async fn min_refresh_interval_throttles_repeated_misses() {
    let fetcher = FakeJwksFetcher::new(jwks_doc(&["kid-1"]));
    let cache = JwksCache::new("https://issuer.example/jwks", Duration::from_secs(3600), Duration::from_secs(3600), fetcher);
    cache.get_key("kid-1").await.unwrap();
    assert_eq!(cache.fetcher.call_count(), 1);

    let _ = cache.get_key("kid-missing").await;
    let _ = cache.get_key("kid-missing").await;
    assert_eq!(cache.fetcher.call_count(), 2, "the throttle should prevent a second forced refresh in quick succession");
}
