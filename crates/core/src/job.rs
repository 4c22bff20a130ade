// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job record: identity, lifecycle state machine, and output buffer.
//!
//! The job service is the only writer of a [`Job`]; every other component
//! sees a cloned snapshot. See [`JobStatus`] for the allowed transitions.

use crate::define_uuid_id;
use crate::notification::NotificationId;
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Identifies a single job.
    pub struct JobId;
}

/// The operation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ProvisionVm,
    DeleteVm,
    ManagedDeploymentV2,
    CreateDisk,
    CreateNic,
    InitializeVm,
    NoopTest,
}

crate::simple_display! {
    JobType {
        ProvisionVm => "provision_vm",
        DeleteVm => "delete_vm",
        ManagedDeploymentV2 => "managed_deployment_v2",
        CreateDisk => "create_disk",
        CreateNic => "create_nic",
        InitializeVm => "initialize_vm",
        NoopTest => "noop_test",
    }
}

/// Lifecycle state. See the module-level state diagram in the job service
/// for the allowed transitions; no transition leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// One entry in a managed deployment's child-job list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildJobRef {
    pub job_id: JobId,
    pub step: String,
    pub status: JobStatus,
}

/// A tracked unit of work dispatched to a Hyper-V host.
///
/// `output` is append-only once a job starts running; `parameters` is the
/// original submitted request body, redacted only at read time (see
/// `hvfleet-jobs::redact`) so the in-memory record always carries the real
/// values needed to actually perform the operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub job_type: JobType,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub target_host: String,
    pub parameters: serde_json::Value,
    pub output: Vec<String>,
    pub error: Option<String>,
    /// The `data` object from the agent's successful envelope response, if
    /// any. Populated by [`Job::mark_completed`]; readers use it directly
    /// and managed-deployment
    /// orchestration reads `data.vm_id` out of it to chain into later steps.
    pub result_data: Option<serde_json::Value>,
    pub notification_id: Option<NotificationId>,
    pub child_jobs: Vec<ChildJobRef>,
}

impl Job {
    pub fn new(job_type: JobType, target_host: impl Into<String>, parameters: serde_json::Value, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            job_id: JobId::new(),
            job_type,
            status: JobStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            target_host: target_host.into(),
            parameters,
            output: Vec::new(),
            error: None,
            result_data: None,
            notification_id: None,
            child_jobs: Vec::new(),
        }
    }

    /// Append one decoded output line. Never call on a terminal job.
    pub fn push_output(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to `running`, stamping `started_at` if not already set.
    pub fn mark_running(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.status = JobStatus::Running;
        self.started_at.get_or_insert(now);
    }

    /// Transition to `completed`, recording the agent's `data` payload (if
    /// any) for readers and for managed-deployment VM-ID chaining.
    pub fn mark_completed(&mut self, result_data: Option<serde_json::Value>, now: chrono::DateTime<chrono::Utc>) {
        self.status = JobStatus::Completed;
        self.started_at.get_or_insert(now);
        self.completed_at = Some(now);
        self.result_data = result_data;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now: chrono::DateTime<chrono::Utc>) {
        self.status = JobStatus::Failed;
        self.started_at.get_or_insert(now);
        self.completed_at = Some(now);
        self.error = Some(error.into());
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct JobBuilder => Job {
        set { job_id: JobId = JobId::new() }
        set { job_type: JobType = JobType::NoopTest }
        set { status: JobStatus = JobStatus::Pending }
        set { created_at: chrono::DateTime<chrono::Utc> = chrono::Utc::now() }
        option { started_at: chrono::DateTime<chrono::Utc> = None }
        option { completed_at: chrono::DateTime<chrono::Utc> = None }
        into { target_host: String = "host01.lab.local" }
        set { parameters: serde_json::Value = serde_json::json!({}) }
        set { output: Vec<String> = Vec::new() }
        option { error: String = None }
        option { result_data: serde_json::Value = None }
        option { notification_id: NotificationId = None }
        set { child_jobs: Vec<ChildJobRef> = Vec::new() }
    }
}

/// Field names (case-insensitive substring match) treated as sensitive by
/// parameter redaction. See `hvfleet-jobs::redact`.
pub const SENSITIVE_FIELD_MARKERS: &[&str] = &["password", "_pw", "secret", "token"];

pub const REDACTED_PLACEHOLDER: &str = "***REDACTED***";

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
