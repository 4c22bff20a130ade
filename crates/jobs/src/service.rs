// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job table: submission, the `running`/`completed`/`failed` state
//! machine, managed-deployment orchestration, and the retention janitor.
//!
//! Follows the same shape as [`hvfleet_notify::NotificationService`]: a
//! single writer lock around an [`IndexMap`], mutate-then-clone-then-drop
//! the lock before any broadcast or cross-service call. Background work
//! (the per-job worker, the output pump) is spawned as a free function over
//! a cloned [`Shared`] handle rather than a method on `&self`, matching
//! [`hvfleet_scheduler`]'s pool workers — that keeps every spawned future
//! `'static` without reaching for a self-referential `Arc<Self>`.

use std::sync::Arc;
use std::time::Duration;

use hvfleet_core::{Broadcaster, ChildJobRef, Clock, Job, JobId, JobStatus, JobType, SystemClock};
use hvfleet_notify::NotificationService;
use hvfleet_scheduler::{QueueKind, RemoteTaskScheduler, SchedulerError, TaskCategory};
use hvfleet_transport::{RemoteAgent, SessionCache, SessionFactory, TransportError};
use hvfleet_wire::{create_job_request, JobResultEnvelope, ResultStatus, StreamDecoder};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::deployment;
use crate::error::JobError;
use crate::guest_config::GuestConfigRequest;
use crate::output::{JobOutputSink, OutputChunk};
use crate::redact::redact_or_empty;
use crate::request::{operation_tag, ManagedDeploymentRequest, SimpleJobRequest};

fn queue_for(job_type: JobType) -> QueueKind {
    match job_type {
        JobType::NoopTest => QueueKind::Short,
        _ => QueueKind::Io,
    }
}

struct Shared<C: Clock> {
    clock: C,
    scheduler: Arc<RemoteTaskScheduler>,
    sessions: Arc<SessionCache<Arc<dyn SessionFactory>>>,
    agent: Arc<dyn RemoteAgent>,
    notify: Arc<NotificationService<C>>,
    broadcaster: Arc<dyn Broadcaster>,
    jobs: Arc<Mutex<IndexMap<JobId, Job>>>,
    default_timeout: Option<Duration>,
}

impl<C: Clock> Clone for Shared<C> {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            scheduler: self.scheduler.clone(),
            sessions: self.sessions.clone(),
            agent: self.agent.clone(),
            notify: self.notify.clone(),
            broadcaster: self.broadcaster.clone(),
            jobs: self.jobs.clone(),
            default_timeout: self.default_timeout,
        }
    }
}

/// Owns every [`Job`] in the process. See module docs for the
/// locking/spawn-as-free-function contract.
pub struct JobService<C: Clock = SystemClock> {
    shared: Shared<C>,
}

impl<C: Clock> JobService<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: C,
        scheduler: Arc<RemoteTaskScheduler>,
        sessions: Arc<SessionCache<Arc<dyn SessionFactory>>>,
        agent: Arc<dyn RemoteAgent>,
        notify: Arc<NotificationService<C>>,
        broadcaster: Arc<dyn Broadcaster>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            shared: Shared {
                clock,
                scheduler,
                sessions,
                agent,
                notify,
                broadcaster,
                jobs: Arc::new(Mutex::new(IndexMap::new())),
                default_timeout,
            },
        }
    }

    /// Allocates a job record, publishes the pending notification, and
    /// dispatches an execution worker. Returns immediately — the caller
    /// never awaits the remote round-trip.
    pub fn submit_simple(&self, job_request: SimpleJobRequest) -> Job {
        let job = Job::new(
            job_request.job_type,
            job_request.target_host.clone(),
            job_request.resource_spec.clone(),
            self.shared.clock.now_utc(),
        );
        let job = insert_pending(&self.shared, job);
        let job_id = job.job_id;
        let shared = self.shared.clone();
        tokio::spawn(async move { run_simple(shared, job_id, job_request).await });
        job
    }

    /// Same contract as [`Self::submit_simple`] but for
    /// `managed_deployment_v2`: the worker dispatches each planned step as
    /// its own child job.
    pub fn submit_managed_deployment(&self, deployment_request: ManagedDeploymentRequest) -> Job {
        let parameters = json!({
            "vm_spec": deployment_request.vm_spec,
            "disk_spec": deployment_request.disk_spec,
            "nic_spec": deployment_request.nic_spec,
            "guest_config": deployment_request.guest_config.as_ref().map(GuestConfigRequest::compose),
        });
        let job = Job::new(
            JobType::ManagedDeploymentV2,
            deployment_request.target_host.clone(),
            parameters,
            self.shared.clock.now_utc(),
        );
        let job = insert_pending(&self.shared, job);
        let job_id = job.job_id;
        let shared = self.shared.clone();
        tokio::spawn(async move { run_managed_deployment(shared, job_id, deployment_request).await });
        job
    }

    /// One job, parameters redacted for external callers.
    pub fn get(&self, job_id: JobId) -> Result<Job, JobError> {
        let mut job = self.shared.jobs.lock().get(&job_id).cloned().ok_or(JobError::NotFound(job_id))?;
        job.parameters = redact_or_empty(&job.parameters);
        Ok(job)
    }

    /// Every tracked job, newest first, parameters redacted.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.shared.jobs.lock().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for job in &mut jobs {
            job.parameters = redact_or_empty(&job.parameters);
        }
        jobs
    }

    pub fn count(&self) -> usize {
        self.shared.jobs.lock().len()
    }

    /// Removes terminal jobs whose `completed_at` is older than `max_age`
    /// The caller decides whether `max_age == Duration::ZERO`
    /// means "skip" — this function sweeps unconditionally on every call.
    pub fn cleanup_older_than(&self, max_age: Duration) -> usize {
        let cutoff = self.shared.clock.now_utc() - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
        let mut jobs = self.shared.jobs.lock();
        let ids: Vec<JobId> = jobs
            .values()
            .filter(|j| j.is_terminal() && j.completed_at.is_some_and(|t| t < cutoff))
            .map(|j| j.job_id)
            .collect();
        for id in &ids {
            jobs.shift_remove(id);
        }
        if !ids.is_empty() {
            info!(removed = ids.len(), "job retention sweep");
        }
        ids.len()
    }
}

fn insert_pending<C: Clock>(shared: &Shared<C>, mut job: Job) -> Job {
    let notification = shared.notify.job_pending(&job);
    job.notification_id = Some(notification.notification_id);
    shared.jobs.lock().insert(job.job_id, job.clone());
    broadcast_job(shared, "pending", &job);
    job
}

fn apply_and_snapshot<C: Clock>(shared: &Shared<C>, job_id: JobId, f: impl FnOnce(&mut Job)) -> Option<Job> {
    let mut jobs = shared.jobs.lock();
    let job = jobs.get_mut(&job_id)?;
    f(job);
    Some(job.clone())
}

async fn transition_running<C: Clock>(shared: &Shared<C>, job_id: JobId) {
    let now = shared.clock.now_utc();
    let Some(job) = apply_and_snapshot(shared, job_id, |j| j.mark_running(now)) else {
        return;
    };
    if let Some(notification_id) = job.notification_id {
        let _ = shared.notify.job_running(notification_id, &job);
    }
    broadcast_job(shared, "running", &job);
}

async fn transition_completed<C: Clock>(shared: &Shared<C>, job_id: JobId, data: Option<Value>) {
    let now = shared.clock.now_utc();
    let Some(job) = apply_and_snapshot(shared, job_id, |j| j.mark_completed(data, now)) else {
        return;
    };
    if let Some(notification_id) = job.notification_id {
        let _ = shared.notify.job_completed(notification_id, &job);
    }
    broadcast_job(shared, "completed", &job);
}

async fn transition_failed<C: Clock>(shared: &Shared<C>, job_id: JobId, error: impl Into<String>) {
    let now = shared.clock.now_utc();
    let error = error.into();
    let Some(job) = apply_and_snapshot(shared, job_id, |j| j.mark_failed(error.clone(), now)) else {
        return;
    };
    if let Some(notification_id) = job.notification_id {
        let _ = shared.notify.job_failed(notification_id, job.job_type, &error);
    }
    warn!(job_id = %job_id, error = %error, "job failed");
    broadcast_job(shared, "failed", &job);
}

fn broadcast_job<C: Clock>(shared: &Shared<C>, action: &str, job: &Job) {
    let payload = json!({ "type": "job", "action": action, "data": job });
    let job_id = job.job_id;
    let broadcaster = shared.broadcaster.clone();
    tokio::spawn(async move {
        broadcaster.broadcast(Some("jobs".to_string()), payload.clone()).await;
        broadcaster.broadcast(Some(format!("jobs:{job_id}")), payload).await;
    });
}

fn append_output<C: Clock>(shared: &Shared<C>, job_id: JobId, line: String) {
    {
        let mut jobs = shared.jobs.lock();
        if let Some(job) = jobs.get_mut(&job_id) {
            job.push_output(line.clone());
        } else {
            return;
        }
    }
    let payload = json!({ "type": "job_output", "job_id": job_id, "line": line });
    let broadcaster = shared.broadcaster.clone();
    tokio::spawn(async move {
        broadcaster.broadcast(Some(format!("jobs:{job_id}")), payload).await;
    });
}

/// Spawns the task that decodes raw agent bytes into lines and appends them
/// to `job_id`'s output. Returns the sink handle
/// to hand to [`hvfleet_transport::RemoteAgent::invoke`] and a join handle
/// the caller awaits once the round-trip finishes, to make sure every
/// decoded line lands before the job transitions to a terminal state.
fn spawn_output_pump<C: Clock>(
    shared: &Shared<C>,
    job_id: JobId,
) -> (tokio::sync::mpsc::UnboundedSender<OutputChunk>, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<OutputChunk>();
    let shared = shared.clone();
    let handle = tokio::spawn(async move {
        let mut decoder = StreamDecoder::new();
        while let Some(chunk) = rx.recv().await {
            let lines = if chunk.is_stderr { decoder.push_stderr(&chunk.bytes) } else { decoder.push_stdout(&chunk.bytes) };
            for line in lines {
                append_output(&shared, job_id, line);
            }
        }
    });
    (tx, handle)
}

/// Runs one envelope round-trip for `job_id` against `target_host` and
/// applies the terminal transition. Shared by simple jobs and each
/// managed-deployment child step.
async fn dispatch_one<C: Clock>(
    shared: &Shared<C>,
    job_id: JobId,
    job_type: JobType,
    operation: &'static str,
    resource_spec: Value,
    target_host: &str,
    category: TaskCategory,
) -> Result<Value, String> {
    let session = match shared.sessions.get_session(target_host).await {
        Ok(session) => session,
        Err(e) => {
            transition_failed(shared, job_id, e.to_string()).await;
            return Err(e.to_string());
        }
    };

    let (tx, pump) = spawn_output_pump(shared, job_id);
    let sink = JobOutputSink::new(tx);
    let agent = shared.agent.clone();
    let envelope_request = create_job_request(operation, resource_spec, None, None);
    let description = format!("{operation} on {target_host}");
    let result = shared
        .scheduler
        .run_blocking(
            target_host,
            queue_for(job_type),
            category,
            description,
            shared.default_timeout,
            CancellationToken::new(),
            move || agent.invoke(session.as_ref(), &envelope_request, &sink, None),
        )
        .await;
    let _ = pump.await;

    finish(shared, job_id, result).await
}

/// Maps a scheduler/envelope outcome onto the job's terminal transition and
/// returns either the agent's `data` payload or a human-readable error.
async fn finish<C: Clock>(
    shared: &Shared<C>,
    job_id: JobId,
    result: Result<JobResultEnvelope, SchedulerError<TransportError>>,
) -> Result<Value, String> {
    match result {
        Ok(envelope) => match envelope.status {
            ResultStatus::Success => {
                transition_completed(shared, job_id, Some(envelope.data.clone())).await;
                Ok(envelope.data)
            }
            ResultStatus::Error => {
                let message = match &envelope.code {
                    Some(code) => format!("{} ({code})", envelope.message),
                    None => envelope.message.clone(),
                };
                transition_failed(shared, job_id, message.clone()).await;
                Err(message)
            }
            ResultStatus::Partial => {
                let message = format!("{} (partial success; logs: {:?})", envelope.message, envelope.logs);
                transition_failed(shared, job_id, message.clone()).await;
                Err(message)
            }
        },
        Err(SchedulerError::Timeout(d)) => {
            let message = format!("remote task timed out after {d:?}");
            transition_failed(shared, job_id, message.clone()).await;
            Err(message)
        }
        Err(SchedulerError::Cancelled) => {
            let message = "job was cancelled before dispatch".to_string();
            transition_failed(shared, job_id, message.clone()).await;
            Err(message)
        }
        Err(SchedulerError::Panicked(message)) => {
            transition_failed(shared, job_id, message.clone()).await;
            Err(message)
        }
        Err(SchedulerError::Task(e)) => {
            let message = e.to_string();
            transition_failed(shared, job_id, message.clone()).await;
            Err(message)
        }
    }
}

async fn run_simple<C: Clock>(shared: Shared<C>, job_id: JobId, job_request: SimpleJobRequest) {
    transition_running(&shared, job_id).await;
    let operation = operation_tag(job_request.job_type);
    let _ = dispatch_one(
        &shared,
        job_id,
        job_request.job_type,
        operation,
        job_request.resource_spec,
        &job_request.target_host,
        TaskCategory::Job,
    )
    .await;
}

fn record_child<C: Clock>(shared: &Shared<C>, parent_id: JobId, child_id: JobId, step: &str) {
    let mut jobs = shared.jobs.lock();
    if let Some(parent) = jobs.get_mut(&parent_id) {
        parent.child_jobs.push(ChildJobRef { job_id: child_id, step: step.to_string(), status: JobStatus::Pending });
    }
}

fn update_child_status<C: Clock>(shared: &Shared<C>, parent_id: JobId, child_id: JobId, status: JobStatus) {
    let mut jobs = shared.jobs.lock();
    if let Some(parent) = jobs.get_mut(&parent_id) {
        if let Some(child_ref) = parent.child_jobs.iter_mut().find(|c| c.job_id == child_id) {
            child_ref.status = status;
        }
    }
}

/// Orchestrates one `managed_deployment_v2` top-level job: runs
/// [`deployment::plan_steps`] in order, each as its own child job, chaining
/// the VM ID extracted from `vm.create`'s result into every later step that
/// needs it. The first failing step short-circuits the remaining steps and
/// fails the parent; already-created child resources are left as-is, by
/// design — there is no rollback.
async fn run_managed_deployment<C: Clock>(shared: Shared<C>, job_id: JobId, deployment_request: ManagedDeploymentRequest) {
    transition_running(&shared, job_id).await;

    let steps = deployment::plan_steps(&deployment_request);
    let mut vm_id: Option<String> = None;

    for step in steps {
        let resource_spec = if step.needs_vm_id {
            match &vm_id {
                Some(id) => deployment::inject_vm_id(&step.resource_spec, id),
                None => {
                    let message = format!("{} requires a vm_id from the vm.create step", step.label);
                    transition_failed(&shared, job_id, message).await;
                    return;
                }
            }
        } else {
            step.resource_spec.clone()
        };

        let child = Job::new(step.job_type, deployment_request.target_host.clone(), resource_spec.clone(), shared.clock.now_utc());
        let child_id = child.job_id;
        insert_pending(&shared, child);
        record_child(&shared, job_id, child_id, step.label);

        let outcome = dispatch_one(
            &shared,
            child_id,
            step.job_type,
            step.operation,
            resource_spec,
            &deployment_request.target_host,
            TaskCategory::Deployment,
        )
        .await;

        match outcome {
            Ok(data) => {
                update_child_status(&shared, job_id, child_id, JobStatus::Completed);
                if step.job_type == JobType::ProvisionVm {
                    vm_id = deployment::extract_vm_id(&data);
                }
            }
            Err(message) => {
                update_child_status(&shared, job_id, child_id, JobStatus::Failed);
                transition_failed(&shared, job_id, format!("{} failed: {message}", step.label)).await;
                return;
            }
        }
    }

    transition_completed(&shared, job_id, None).await;
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
