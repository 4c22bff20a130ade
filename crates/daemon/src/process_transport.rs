// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A concrete, CLI-shelling [`SessionFactory`]/[`RemoteAgent`] pair.
//!
//! Vendoring a WinRM/Kerberos client crate is out of scope for this
//! workspace, and fabricating one would violate the one rule that matters
//! more than having a "real" transport: every dependency here has to be a
//! crate that actually exists. Instead this adapter shells out to
//! `winrs`/`pwsh`, which are already present on an operator workstation
//! domain-joined to the target fleet, and satisfies the trait boundary
//! with nothing more exotic than [`std::process::Command`].
//!
//! `timeout` is accepted but not enforced here, mirroring
//! [`hvfleet_scheduler::RemoteTaskScheduler::run_blocking`]'s own
//! documented semantics: it bounds the caller's wait, not the subprocess's
//! lifetime. A caller that times out leaves the child process running to
//! completion in the background.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use hvfleet_transport::{AgentOutputSink, RemoteAgent, Session, SessionFactory, TransportError};
use hvfleet_wire::{parse_job_result, JobRequest, JobResultEnvelope};

/// A stateless handle — every invocation spawns a fresh `winrs` process,
/// so there is no persistent connection for this type to carry beyond the
/// hostname itself.
pub struct ProcessSession {
    hostname: String,
}

impl Session for ProcessSession {
    fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// Validates a hostname against an optional allow-list before handing
/// back a [`ProcessSession`]. An empty allow-list accepts any hostname —
/// useful when the fleet list is already constrained by
/// `hyperv_hosts` upstream.
pub struct ProcessSessionFactory {
    known_hosts: Vec<String>,
}

impl ProcessSessionFactory {
    pub fn new(known_hosts: Vec<String>) -> Self {
        Self { known_hosts }
    }
}

impl SessionFactory for ProcessSessionFactory {
    fn connect(&self, hostname: &str) -> Result<Arc<dyn Session>, TransportError> {
        if !self.known_hosts.is_empty() && !self.known_hosts.iter().any(|h| h == hostname) {
            return Err(TransportError::ConnectFailed {
                hostname: hostname.to_string(),
                message: "host is not in the configured fleet".to_string(),
            });
        }
        Ok(Arc::new(ProcessSession { hostname: hostname.to_string() }))
    }
}

/// Invokes the remote agent script over `winrs`, streaming stdout/stderr
/// to `sink` as it arrives and parsing the final JSON object off stdout.
pub struct ProcessRemoteAgent {
    winrm_username: Option<String>,
    winrm_password: Option<String>,
    winrm_port: u16,
    host_install_directory: String,
}

impl ProcessRemoteAgent {
    pub fn new(
        winrm_username: Option<String>,
        winrm_password: Option<String>,
        winrm_port: u16,
        host_install_directory: String,
    ) -> Self {
        Self { winrm_username, winrm_password, winrm_port, host_install_directory }
    }

    fn winrs_target(&self, hostname: &str) -> String {
        format!("-r:https://{hostname}:{port}", port = self.winrm_port)
    }
}

impl RemoteAgent for ProcessRemoteAgent {
    fn invoke(
        &self,
        session: &dyn Session,
        request: &JobRequest,
        sink: &dyn AgentOutputSink,
        _timeout: Option<Duration>,
    ) -> Result<JobResultEnvelope, TransportError> {
        let hostname = session.hostname();
        let remote_script = format!("{}/agent.ps1", self.host_install_directory);

        let mut command = Command::new("pwsh");
        command.arg("-NoProfile").arg("-NonInteractive").arg("-Command").arg("winrs");
        command.arg(self.winrs_target(hostname));
        if let Some(user) = &self.winrm_username {
            command.arg(format!("-u:{user}"));
        }
        if let Some(password) = &self.winrm_password {
            command.arg(format!("-p:{password}"));
        }
        command.arg("--").arg("pwsh").arg("-NoProfile").arg("-NonInteractive").arg("-File").arg(&remote_script);
        command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|err| TransportError::AgentIo(err.to_string()))?;

        let payload = serde_json::to_vec(request)
            .map_err(|err| TransportError::AgentIo(format!("failed to encode request: {err}")))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).map_err(|err| TransportError::AgentIo(err.to_string()))?;
        }

        let mut stdout = child.stdout.take().ok_or_else(|| TransportError::AgentIo("no stdout handle".into()))?;
        let mut stderr = child.stderr.take().ok_or_else(|| TransportError::AgentIo("no stderr handle".into()))?;

        let stderr_handle = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        });

        let mut stdout_buf = Vec::new();
        stdout.read_to_end(&mut stdout_buf).map_err(|err| TransportError::AgentIo(err.to_string()))?;
        sink.on_stdout(&stdout_buf);

        let stderr_buf = stderr_handle.join().unwrap_or_default();
        if !stderr_buf.is_empty() {
            sink.on_stderr(&stderr_buf);
        }

        let status = child.wait().map_err(|err| TransportError::AgentIo(err.to_string()))?;
        if !status.success() {
            return Err(TransportError::AgentIo(format!(
                "agent process for {hostname} exited with status {status}"
            )));
        }

        let raw = String::from_utf8_lossy(&stdout_buf);
        let last_line = raw.lines().rev().find(|line| !line.trim().is_empty()).unwrap_or("");
        let envelope = parse_job_result(last_line)?;
        if envelope.correlation_id != request.correlation_id {
            return Err(TransportError::CorrelationMismatch {
                expected: request.correlation_id,
                got: envelope.correlation_id,
            });
        }
        Ok(envelope)
    }
}
