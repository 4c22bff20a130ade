// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One cached [`Session`] per hostname, built lazily and never mutated
//! after construction.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::session::{Session, SessionFactory, TransportError};

type SessionCell = Arc<OnceCell<Result<Arc<dyn Session>, TransportError>>>;

/// Map from hostname to a lazily-constructed, cached session.
///
/// `get_session` is async-safe: two concurrent callers for the same
/// unconstructed host share one [`tokio::sync::OnceCell`] rather than
/// each racing to build a session. The map mutex ([`parking_lot::Mutex`],
/// held only to get-or-insert the cell) is dropped before the
/// potentially-blocking construction runs, so it never holds across an
/// await point.
pub struct SessionCache<F> {
    factory: Arc<F>,
    sessions: Mutex<HashMap<String, SessionCell>>,
}

impl<F> SessionCache<F>
where
    F: SessionFactory,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch or lazily construct the session for `hostname`. Construction
    /// runs on a blocking thread (`spawn_blocking`) since
    /// [`SessionFactory::connect`] may block.
    pub async fn get_session(&self, hostname: &str) -> Result<Arc<dyn Session>, TransportError> {
        let cell: SessionCell = {
            let mut sessions = self.sessions.lock();
            sessions.entry(hostname.to_string()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };

        let factory = self.factory.clone();
        let host = hostname.to_string();
        let result = cell
            .get_or_init(|| async move {
                let host_for_panic = host.clone();
                tokio::task::spawn_blocking(move || factory.connect(&host))
                    .await
                    .unwrap_or_else(|join_err| {
                        Err(TransportError::ConstructionPanicked {
                            hostname: host_for_panic,
                            message: join_err.to_string(),
                        })
                    })
            })
            .await;
        // `TransportError` isn't `Clone` (it wraps non-`Clone` parse
        // errors), so a cached failure is re-described rather than
        // cloned; the session itself is a cheap `Arc` clone.
        match result {
            Ok(session) => Ok(session.clone()),
            Err(e) => Err(TransportError::ConnectFailed {
                hostname: hostname.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Invalidate the cached session for `hostname`, if any. The next
    /// `get_session` call reconstructs it from scratch.
    pub fn close(&self, hostname: &str) {
        self.sessions.lock().remove(hostname);
    }

    /// Number of hosts with a cache entry (constructed or in-flight).
    /// Test/diagnostic helper.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
