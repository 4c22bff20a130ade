// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`Session`]/[`SessionFactory`]/[`RemoteAgent`] boundary.
//!
//! Construction and invocation are deliberately synchronous, blocking
//! traits: the remote task scheduler is the
//! only component allowed to own a blocking wait, dispatching these calls
//! onto its worker pool. Nothing in this crate spawns its own threads
//! outside [`crate::cache::SessionCache`]'s single-flight construction.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use hvfleet_wire::JobRequest;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to establish a session with {hostname}: {message}")]
    ConnectFailed { hostname: String, message: String },
    #[error("session construction for {hostname} panicked: {message}")]
    ConstructionPanicked { hostname: String, message: String },
    #[error("agent echoed correlation_id {got} but {expected} was sent")]
    CorrelationMismatch { expected: Uuid, got: Uuid },
    #[error("agent I/O failure: {0}")]
    AgentIo(String),
    #[error("failed to parse the agent's result payload: {0}")]
    Malformed(#[from] hvfleet_wire::EnvelopeError),
}

/// An established, reusable management-protocol session for one host.
/// Carries whatever credential/connection state the concrete transport
/// needs; the core never inspects it beyond `hostname()`.
pub trait Session: Send + Sync + 'static {
    fn hostname(&self) -> &str;
}

/// Constructs a [`Session`] for a hostname. Implementations may block
/// (Kerberos ticket acquisition, an initial handshake) — callers run this
/// off the async runtime's worker threads, never inline.
pub trait SessionFactory: Send + Sync + 'static {
    fn connect(&self, hostname: &str) -> Result<Arc<dyn Session>, TransportError>;
}

/// Lets callers hold a single `Arc<dyn SessionFactory>` and still plug it
/// into [`crate::cache::SessionCache`], which is generic over `F` rather
/// than a trait object — the job and inventory services depend on exactly
/// one dynamic factory, so there's no reason to push the generic parameter
/// up through every service they're built from.
impl SessionFactory for Arc<dyn SessionFactory> {
    fn connect(&self, hostname: &str) -> Result<Arc<dyn Session>, TransportError> {
        (**self).connect(hostname)
    }
}

/// Receives raw, undecoded bytes as the agent emits them, before any
/// CLIXML/line decoding. The job service is the actual consumer — it owns
/// a `hvfleet_wire::StreamDecoder` per job and feeds it from here.
pub trait AgentOutputSink: Send + Sync {
    fn on_stdout(&self, chunk: &[u8]);
    fn on_stderr(&self, chunk: &[u8]);
}

/// A sink that discards everything, for operations that don't stream
/// (or tests that don't care about output).
pub struct NullSink;

impl AgentOutputSink for NullSink {
    fn on_stdout(&self, _chunk: &[u8]) {}
    fn on_stderr(&self, _chunk: &[u8]) {}
}

/// Executes one envelope-protocol round-trip against an established
/// session: serializes `request`, runs the agent, streams intermediate
/// output to `sink`, and parses the final result.
///
/// The PowerShell agent process and the underlying transport library are
/// explicitly out of scope here — this trait is the entire surface the
/// rest of the core depends on, so any concrete transport (WinRM, SSH, a
/// local test double) is a drop-in.
pub trait RemoteAgent: Send + Sync + 'static {
    fn invoke(
        &self,
        session: &dyn Session,
        request: &JobRequest,
        sink: &dyn AgentOutputSink,
        timeout: Option<Duration>,
    ) -> Result<hvfleet_wire::JobResultEnvelope, TransportError>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// A session handle with no real connection behind it.
    #[derive(Debug, Clone)]
    pub struct FakeSession {
        hostname: String,
    }

    impl FakeSession {
        pub fn new(hostname: impl Into<String>) -> Self {
            Self { hostname: hostname.into() }
        }
    }

    impl Session for FakeSession {
        fn hostname(&self) -> &str {
            &self.hostname
        }
    }

    /// A factory that always succeeds, except for hostnames explicitly
    /// marked to fail via [`FakeSessionFactory::fail_for`]. Records every
    /// call so tests can assert convergence (single construction) under
    /// concurrent callers.
    #[derive(Clone, Default)]
    pub struct FakeSessionFactory {
        state: Arc<Mutex<FakeSessionFactoryState>>,
    }

    #[derive(Default)]
    struct FakeSessionFactoryState {
        failing: HashMap<String, String>,
        connect_calls: Vec<String>,
    }

    impl FakeSessionFactory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_for(&self, hostname: impl Into<String>, message: impl Into<String>) {
            self.state.lock().failing.insert(hostname.into(), message.into());
        }

        pub fn connect_calls(&self) -> Vec<String> {
            self.state.lock().connect_calls.clone()
        }

        pub fn connect_count(&self, hostname: &str) -> usize {
            self.state.lock().connect_calls.iter().filter(|h| h.as_str() == hostname).count()
        }
    }

    impl SessionFactory for FakeSessionFactory {
        fn connect(&self, hostname: &str) -> Result<Arc<dyn Session>, TransportError> {
            let mut state = self.state.lock();
            state.connect_calls.push(hostname.to_string());
            if let Some(message) = state.failing.get(hostname).cloned() {
                return Err(TransportError::ConnectFailed { hostname: hostname.to_string(), message });
            }
            Ok(Arc::new(FakeSession::new(hostname)))
        }
    }

    /// A scriptable agent: returns a canned [`hvfleet_wire::JobResultEnvelope`]
    /// per operation (falling back to a generic success), optionally
    /// emitting scripted output lines through the sink first, and
    /// optionally sleeping to simulate a slow host.
    #[derive(Clone, Default)]
    pub struct FakeRemoteAgent {
        state: Arc<Mutex<FakeRemoteAgentState>>,
    }

    #[derive(Default)]
    struct FakeRemoteAgentState {
        responses: HashMap<String, Result<hvfleet_wire::JobResultEnvelope, String>>,
        stdout_lines: HashMap<String, Vec<String>>,
        delay: HashMap<String, Duration>,
        invocations: Vec<(String, Uuid)>,
    }

    impl FakeRemoteAgent {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, operation: impl Into<String>, envelope: hvfleet_wire::JobResultEnvelope) {
            self.state.lock().responses.insert(operation.into(), Ok(envelope));
        }

        pub fn fail(&self, operation: impl Into<String>, message: impl Into<String>) {
            self.state.lock().responses.insert(operation.into(), Err(message.into()));
        }

        pub fn stream(&self, operation: impl Into<String>, lines: Vec<String>) {
            self.state.lock().stdout_lines.insert(operation.into(), lines);
        }

        pub fn delay(&self, operation: impl Into<String>, duration: Duration) {
            self.state.lock().delay.insert(operation.into(), duration);
        }

        pub fn invocations(&self) -> Vec<(String, Uuid)> {
            self.state.lock().invocations.clone()
        }
    }

    impl RemoteAgent for FakeRemoteAgent {
        fn invoke(
            &self,
            _session: &dyn Session,
            request: &JobRequest,
            sink: &dyn AgentOutputSink,
            _timeout: Option<Duration>,
        ) -> Result<hvfleet_wire::JobResultEnvelope, TransportError> {
            let (delay, lines, response) = {
                let mut state = self.state.lock();
                state.invocations.push((request.operation.clone(), request.correlation_id));
                (
                    state.delay.get(&request.operation).copied(),
                    state.stdout_lines.get(&request.operation).cloned().unwrap_or_default(),
                    state.responses.get(&request.operation).cloned(),
                )
            };
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
            for line in lines {
                sink.on_stdout(format!("{line}\n").as_bytes());
            }
            match response {
                Some(Ok(envelope)) => Ok(envelope),
                Some(Err(message)) => Err(TransportError::AgentIo(message)),
                None => Ok(hvfleet_wire::JobResultEnvelope {
                    status: hvfleet_wire::ResultStatus::Success,
                    message: "ok".to_string(),
                    data: serde_json::Value::Object(serde_json::Map::new()),
                    code: None,
                    logs: Vec::new(),
                    correlation_id: request.correlation_id,
                }),
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
