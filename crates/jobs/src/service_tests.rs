// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use hvfleet_core::{FakeClock, JobId, JobStatus, JobType, RecordingBroadcaster, REDACTED_PLACEHOLDER};
use hvfleet_notify::NotificationService;
use hvfleet_scheduler::{RemoteTaskScheduler, SchedulerConfig};
use hvfleet_transport::{FakeRemoteAgent, FakeSessionFactory, SessionCache, SessionFactory};
use hvfleet_wire::{JobResultEnvelope, ResultStatus};
use serde_json::{json, Value};

use super::*;
use crate::guest_config::GuestConfigRequest;

fn ok_envelope(data: Value) -> JobResultEnvelope {
    JobResultEnvelope {
        status: ResultStatus::Success,
        message: "ok".to_string(),
        data,
        code: None,
        logs: Vec::new(),
        correlation_id: uuid::Uuid::nil(),
    }
}

fn service() -> (JobService<FakeClock>, FakeRemoteAgent, RecordingBroadcaster, FakeClock) {
    let clock = FakeClock::new();
    let scheduler = RemoteTaskScheduler::new(SchedulerConfig::default());
    let factory: Arc<dyn SessionFactory> = Arc::new(FakeSessionFactory::new());
    let sessions = Arc::new(SessionCache::new(factory));
    let agent = FakeRemoteAgent::new();
    let broadcaster = RecordingBroadcaster::new();
    let notify = Arc::new(NotificationService::new(clock.clone(), Arc::new(broadcaster.clone())));
    let svc = JobService::new(
        clock.clone(),
        Arc::new(scheduler),
        sessions,
        Arc::new(agent.clone()),
        notify,
        Arc::new(broadcaster.clone()),
        None,
    );
    (svc, agent, broadcaster, clock)
}

async fn wait_terminal(svc: &JobService<FakeClock>, job_id: JobId) -> hvfleet_core::Job {
    for _ in 0..500 {
        if let Ok(job) = svc.get(job_id) {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("job {job_id} did not reach a terminal state in time");
}

/// A noop-test job round-trips a correlation ID and the agent's
/// echoed `data` lands on the completed job.
#[tokio::test]
async fn scenario_correlation_round_trip_completes_with_echoed_data() {
    let (svc, agent, _bcast, _clock) = service();
    agent.respond("noop-test", ok_envelope(json!({"test_field_echo": "value"})));

    let job = svc.submit_simple(SimpleJobRequest::new(JobType::NoopTest, "host01", json!({"test": "value"})).unwrap());
    let finished = wait_terminal(&svc, job.job_id).await;

    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.result_data.unwrap()["test_field_echo"], "value");
    assert_eq!(agent.invocations().len(), 1);
    assert_eq!(agent.invocations()[0].0, "noop-test");
}

#[tokio::test]
async fn agent_error_status_fails_the_job_with_code_preserved() {
    let (svc, agent, _bcast, _clock) = service();
    agent.respond(
        "vm.create",
        JobResultEnvelope {
            status: ResultStatus::Error,
            message: "insufficient resources".to_string(),
            data: json!({}),
            code: Some("E_RESOURCES".to_string()),
            logs: Vec::new(),
            correlation_id: uuid::Uuid::nil(),
        },
    );

    let job = svc.submit_simple(SimpleJobRequest::new(JobType::ProvisionVm, "host01", json!({"name": "vm1"})).unwrap());
    let finished = wait_terminal(&svc, job.job_id).await;

    assert_eq!(finished.status, JobStatus::Failed);
    let error = finished.error.unwrap();
    assert!(error.contains("insufficient resources"));
    assert!(error.contains("E_RESOURCES"));
}

#[tokio::test]
async fn transport_failure_fails_the_job() {
    let (svc, agent, _bcast, _clock) = service();
    agent.fail("vm.create", "connection reset");

    let job = svc.submit_simple(SimpleJobRequest::new(JobType::ProvisionVm, "host01", json!({"name": "vm1"})).unwrap());
    let finished = wait_terminal(&svc, job.job_id).await;

    assert_eq!(finished.status, JobStatus::Failed);
    assert!(finished.error.unwrap().contains("connection reset"));
}

/// A full managed-deployment request orders its child jobs
/// vm.create, disk.create, nic.create, initialize, chains the VM ID from
/// vm.create into the two steps that need it, and the composed `initialize`
/// payload carries exactly the LA + domain-join keys.
#[tokio::test]
async fn scenario_managed_deployment_with_domain_join() {
    let (svc, agent, _bcast, _clock) = service();
    agent.respond("vm.create", ok_envelope(json!({"vm_id": "vm-123"})));
    agent.respond("disk.create", ok_envelope(json!({})));
    agent.respond("nic.create", ok_envelope(json!({})));
    agent.respond("initialize", ok_envelope(json!({})));

    let guest_config = GuestConfigRequest::new(
        "la-admin",
        "hunter2",
        Some("CORP".to_string()),
        Some("joiner".to_string()),
        Some("secret".to_string()),
        Some("OU=Servers".to_string()),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    )
    .unwrap();
    let request = ManagedDeploymentRequest::new(
        "host01",
        json!({"name": "vm1"}),
        Some(json!({"size_gb": 40})),
        Some(json!({"vswitch": "external"})),
        Some(guest_config),
    )
    .unwrap();

    let job = svc.submit_managed_deployment(request);
    let finished = wait_terminal(&svc, job.job_id).await;

    assert_eq!(finished.status, JobStatus::Completed);
    let steps: Vec<&str> = finished.child_jobs.iter().map(|c| c.step.as_str()).collect();
    assert_eq!(steps, vec!["vm.create", "disk.create", "nic.create", "initialize"]);
    assert!(finished.child_jobs.iter().all(|c| c.status == JobStatus::Completed));

    let disk_child = finished.child_jobs.iter().find(|c| c.step == "disk.create").unwrap();
    let disk_job = svc.get(disk_child.job_id).unwrap();
    assert_eq!(disk_job.parameters["vm_id"], "vm-123");
    assert_eq!(disk_job.parameters["size_gb"], 40);

    let nic_child = finished.child_jobs.iter().find(|c| c.step == "nic.create").unwrap();
    let nic_job = svc.get(nic_child.job_id).unwrap();
    assert_eq!(nic_job.parameters["vm_id"], "vm-123");

    let init_child = finished.child_jobs.iter().find(|c| c.step == "initialize").unwrap();
    let init_job = svc.get(init_child.job_id).unwrap();
    assert_eq!(init_job.parameters["guest_domain_join_target"], "CORP");
    assert_eq!(init_job.parameters["guest_la_pw"], REDACTED_PLACEHOLDER);
    assert!(init_job.parameters.get("guest_ansible_ssh_user").is_none());
    assert!(init_job.parameters.get("guest_ip_addr").is_none());
}

/// A failing middle step short-circuits the remaining steps and fails the
/// parent; already-created child resources are left as-is, by design.
#[tokio::test]
async fn managed_deployment_short_circuits_on_step_failure() {
    let (svc, agent, _bcast, _clock) = service();
    agent.respond("vm.create", ok_envelope(json!({"vm_id": "vm-123"})));
    agent.fail("nic.create", "nic driver fault");

    let request = ManagedDeploymentRequest::new(
        "host01",
        json!({"name": "vm1"}),
        None,
        Some(json!({"vswitch": "external"})),
        None,
    )
    .unwrap();

    let job = svc.submit_managed_deployment(request);
    let finished = wait_terminal(&svc, job.job_id).await;

    assert_eq!(finished.status, JobStatus::Failed);
    assert!(finished.error.unwrap().contains("nic.create"));
    let steps: Vec<&str> = finished.child_jobs.iter().map(|c| c.step.as_str()).collect();
    assert_eq!(steps, vec!["vm.create", "nic.create"], "initialize must never be dispatched");
    assert_eq!(finished.child_jobs[0].status, JobStatus::Completed);
    assert_eq!(finished.child_jobs[1].status, JobStatus::Failed);
}

#[tokio::test]
async fn get_redacts_sensitive_parameters_but_preserves_keys() {
    let (svc, agent, _bcast, _clock) = service();
    agent.respond("vm.create", ok_envelope(json!({})));
    let job = svc.submit_simple(
        SimpleJobRequest::new(JobType::ProvisionVm, "host01", json!({"name": "vm1", "admin_password": "hunter2"})).unwrap(),
    );
    wait_terminal(&svc, job.job_id).await;

    let read = svc.get(job.job_id).unwrap();
    assert_eq!(read.parameters["name"], "vm1");
    assert_eq!(read.parameters["admin_password"], REDACTED_PLACEHOLDER);
}

#[tokio::test]
async fn get_unknown_job_is_not_found() {
    let (svc, _agent, _bcast, _clock) = service();
    let err = svc.get(JobId::new()).unwrap_err();
    assert!(matches!(err, JobError::NotFound(_)));
}

#[tokio::test]
async fn list_orders_newest_first() {
    let (svc, agent, _bcast, _clock) = service();
    agent.respond("noop-test", ok_envelope(json!({})));
    let first = svc.submit_simple(SimpleJobRequest::new(JobType::NoopTest, "host01", json!({})).unwrap());
    wait_terminal(&svc, first.job_id).await;
    let second = svc.submit_simple(SimpleJobRequest::new(JobType::NoopTest, "host01", json!({})).unwrap());
    wait_terminal(&svc, second.job_id).await;

    let jobs = svc.list();
    assert_eq!(jobs.len(), 2);
    assert!(jobs[0].created_at >= jobs[1].created_at);
}

/// The retention janitor removes only terminal jobs older than the
/// configured age, leaving fresher ones untouched.
#[tokio::test]
async fn cleanup_older_than_sweeps_only_aged_terminal_jobs() {
    let (svc, agent, _bcast, clock) = service();
    agent.respond("noop-test", ok_envelope(json!({})));
    let job = svc.submit_simple(SimpleJobRequest::new(JobType::NoopTest, "host01", json!({})).unwrap());
    wait_terminal(&svc, job.job_id).await;

    assert_eq!(svc.cleanup_older_than(Duration::from_secs(3600)), 0, "job is not yet old enough to sweep");
    assert_eq!(svc.count(), 1);

    clock.advance(Duration::from_secs(7200));
    assert_eq!(svc.cleanup_older_than(Duration::from_secs(3600)), 1, "aged terminal job must be swept");
    assert_eq!(svc.count(), 0);
}

#[tokio::test]
async fn simple_job_broadcasts_pending_running_and_completed() {
    let (svc, agent, bcast, _clock) = service();
    agent.respond("noop-test", ok_envelope(json!({})));
    let job = svc.submit_simple(SimpleJobRequest::new(JobType::NoopTest, "host01", json!({})).unwrap());
    wait_terminal(&svc, job.job_id).await;
    tokio::task::yield_now().await;

    let actions: Vec<String> = bcast
        .calls_for_topic("jobs")
        .into_iter()
        .map(|v| v["action"].as_str().unwrap_or_default().to_string())
        .collect();
    assert!(actions.contains(&"pending".to_string()));
    assert!(actions.contains(&"running".to_string()));
    assert!(actions.contains(&"completed".to_string()));
}
