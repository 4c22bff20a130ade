// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

#[test]
fn new_job_starts_pending_with_no_timestamps() {
    let job = Job::new(JobType::NoopTest, "host01", serde_json::json!({}), Utc::now());
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.started_at.is_none());
    assert!(job.completed_at.is_none());
    assert!(!job.is_terminal());
}

#[test]
fn mark_running_stamps_started_at_once() {
    let mut job = Job::new(JobType::ProvisionVm, "host01", serde_json::json!({}), Utc::now());
    let t1 = Utc::now();
    job.mark_running(t1);
    assert_eq!(job.started_at, Some(t1));

    let t2 = t1 + chrono::Duration::seconds(5);
    job.mark_running(t2);
    assert_eq!(job.started_at, Some(t1), "started_at must not move once set");
}

#[test]
fn mark_completed_is_terminal() {
    let mut job = Job::new(JobType::ProvisionVm, "host01", serde_json::json!({}), Utc::now());
    let now = Utc::now();
    job.mark_completed(Some(serde_json::json!({"vm_id": "abc"})), now);
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.is_terminal());
    assert_eq!(job.completed_at, Some(now));
    assert_eq!(job.result_data.unwrap()["vm_id"], "abc");
}

#[test]
fn mark_failed_records_error() {
    let mut job = Job::new(JobType::DeleteVm, "host01", serde_json::json!({}), Utc::now());
    job.mark_failed("winrm timeout", Utc::now());
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("winrm timeout"));
    assert!(job.is_terminal());
}

#[test]
fn push_output_appends_in_order() {
    let mut job = Job::new(JobType::NoopTest, "host01", serde_json::json!({}), Utc::now());
    job.push_output("line 1");
    job.push_output("line 2");
    assert_eq!(job.output, vec!["line 1", "line 2"]);
}

#[test]
fn job_type_display_is_snake_case() {
    assert_eq!(JobType::ManagedDeploymentV2.to_string(), "managed_deployment_v2");
    assert_eq!(JobStatus::Running.to_string(), "running");
}

#[test]
fn serde_round_trip_preserves_fields() {
    let job = Job::new(JobType::CreateDisk, "host02", serde_json::json!({"size_gb": 40}), Utc::now());
    let json = serde_json::to_string(&job).unwrap();
    let back: Job = serde_json::from_str(&json).unwrap();
    assert_eq!(back.job_id, job.job_id);
    assert_eq!(back.target_host, "host02");
    assert_eq!(back.parameters["size_gb"], 40);
}
