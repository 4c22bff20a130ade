// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pre-refresh PowerShell agent artifact bootstrap. Deliberately a thin,
//! synchronous, blocking trait, dispatched through
//! [`hvfleet_scheduler::RemoteTaskScheduler`] the same way
//! [`hvfleet_transport::RemoteAgent::invoke`] is — construction/transfer of
//! the artifact bundle onto the host is out of scope for this crate.

/// Deploys the agent artifact bundle onto one host. Implementations may
/// block; callers run this off the async runtime's worker threads.
pub trait ArtifactDeployer: Send + Sync + 'static {
    fn deploy(&self, hostname: &str) -> Result<(), String>;
}

/// The default when no deployment backend is configured — every call
/// succeeds trivially, used when artifact deployment is disabled.
pub struct NullArtifactDeployer;

impl ArtifactDeployer for NullArtifactDeployer {
    fn deploy(&self, _hostname: &str) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::ArtifactDeployer;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Scriptable deployer: fails for hosts explicitly marked via
    /// [`FakeArtifactDeployer::fail_for`], records every call.
    #[derive(Clone, Default)]
    pub struct FakeArtifactDeployer {
        state: Arc<Mutex<State>>,
    }

    #[derive(Default)]
    struct State {
        failing: HashMap<String, String>,
        calls: Vec<String>,
    }

    impl FakeArtifactDeployer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_for(&self, hostname: impl Into<String>, message: impl Into<String>) {
            self.state.lock().failing.insert(hostname.into(), message.into());
        }

        pub fn calls(&self) -> Vec<String> {
            self.state.lock().calls.clone()
        }
    }

    impl ArtifactDeployer for FakeArtifactDeployer {
        fn deploy(&self, hostname: &str) -> Result<(), String> {
            let mut state = self.state.lock();
            state.calls.push(hostname.to_string());
            match state.failing.get(hostname) {
                Some(message) => Err(message.clone()),
                None => Ok(()),
            }
        }
    }
}
