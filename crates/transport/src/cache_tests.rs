// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::session::fake::FakeSessionFactory;
use std::sync::Arc;

#[tokio::test]
async fn get_session_constructs_once_per_host() {
    let factory = FakeSessionFactory::new();
    let cache = SessionCache::new(factory.clone());

    let s1 = cache.get_session("host01").await.unwrap();
    let s2 = cache.get_session("host01").await.unwrap();
    assert_eq!(s1.hostname(), "host01");
    assert_eq!(s2.hostname(), "host01");
    assert_eq!(factory.connect_count("host01"), 1);
}

#[tokio::test]
async fn concurrent_callers_converge_on_one_construction() {
    let factory = FakeSessionFactory::new();
    let cache = Arc::new(SessionCache::new(factory.clone()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.get_session("shared-host").await }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }
    assert_eq!(factory.connect_count("shared-host"), 1);
}

#[tokio::test]
async fn distinct_hosts_construct_independently() {
    let factory = FakeSessionFactory::new();
    let cache = SessionCache::new(factory.clone());

    cache.get_session("host01").await.unwrap();
    cache.get_session("host02").await.unwrap();
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn connect_failure_is_surfaced() {
    let factory = FakeSessionFactory::new();
    factory.fail_for("bad-host", "kerberos ticket denied");
    let cache = SessionCache::new(factory);

    let err = cache.get_session("bad-host").await.unwrap_err();
    assert!(err.to_string().contains("bad-host"));
}

#[tokio::test]
async fn close_invalidates_and_forces_reconstruction() {
    let factory = FakeSessionFactory::new();
    let cache = SessionCache::new(factory.clone());

    cache.get_session("host01").await.unwrap();
    cache.close("host01");
    cache.get_session("host01").await.unwrap();
    assert_eq!(factory.connect_count("host01"), 2);
}
