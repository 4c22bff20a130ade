// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use hvfleet_core::{FakeClock, Job, JobType, NotificationCategory, NotificationLevel, RecordingBroadcaster};

use super::*;

fn service() -> (NotificationService<FakeClock>, FakeClock, RecordingBroadcaster) {
    let clock = FakeClock::new();
    let broadcaster = RecordingBroadcaster::new();
    let svc = NotificationService::new(clock.clone(), Arc::new(broadcaster.clone()));
    (svc, clock, broadcaster)
}

// Give spawned broadcast tasks a chance to run on the current-thread test
// runtime before assertions inspect the recording broadcaster.
async fn settle() {
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

#[tokio::test]
async fn create_stores_and_broadcasts() {
    let (svc, _clock, bcast) = service();
    let n = svc.create("t", "m", NotificationLevel::Info, NotificationCategory::Vm, None, None);
    settle().await;
    assert_eq!(svc.count(), 1);
    assert_eq!(bcast.calls_for_topic("notifications").len(), 1);
    assert_eq!(n.read, false);
}

#[tokio::test]
async fn upsert_system_creates_then_mutates_in_place() {
    let (svc, _clock, bcast) = service();
    let first = svc.upsert_system("host:h1", "Host h1 unreachable", "timeout", NotificationLevel::Warning, None);
    let second = svc.upsert_system("host:h1", "Host h1 unreachable", "connection refused", NotificationLevel::Warning, None);
    settle().await;

    assert_eq!(svc.count(), 1, "repeated upsert must not grow the table");
    assert_eq!(first.notification_id, second.notification_id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(second.message, "connection refused");
    assert_eq!(bcast.calls_for_topic("notifications").len(), 2);
}

#[tokio::test]
async fn upsert_system_idempotence_is_stable_across_many_reposts() {
    let (svc, _clock, _bcast) = service();
    let first = svc.upsert_system("k", "t", "m1", NotificationLevel::Info, None);
    for i in 0..10 {
        svc.upsert_system("k", "t", format!("m{i}"), NotificationLevel::Info, None);
    }
    assert_eq!(svc.count(), 1);
    let all = svc.list(None);
    assert_eq!(all[0].notification_id, first.notification_id);
}

#[tokio::test]
async fn clear_system_removes_only_the_matching_key() {
    let (svc, _clock, _bcast) = service();
    svc.upsert_system("k1", "t", "m", NotificationLevel::Info, None);
    svc.upsert_system("k2", "t", "m", NotificationLevel::Info, None);

    assert!(svc.clear_system("k1"));
    assert_eq!(svc.count(), 1);
    assert!(!svc.clear_system("k1"), "second clear is a no-op, not an error");
}

#[tokio::test]
async fn mark_read_updates_unread_count_and_broadcasts() {
    let (svc, _clock, bcast) = service();
    let n = svc.create("t", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    assert_eq!(svc.unread_count(), 1);

    svc.mark_read(n.notification_id).unwrap();
    settle().await;

    assert_eq!(svc.unread_count(), 0);
    let calls = bcast.calls_for_topic("notifications");
    let last = calls.last().unwrap();
    assert_eq!(last["action"], "updated");
    assert_eq!(last["data"]["unread_count"], 0);
}

#[tokio::test]
async fn mark_read_on_unknown_id_is_an_error() {
    let (svc, _clock, _bcast) = service();
    let err = svc.mark_read(hvfleet_core::NotificationId::new()).unwrap_err();
    assert!(matches!(err, NotifyError::NotFound(_)));
}

#[tokio::test]
async fn mark_all_read_only_counts_changed_records() {
    let (svc, _clock, _bcast) = service();
    let n1 = svc.create("t", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    svc.create("t", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    svc.mark_read(n1.notification_id).unwrap();

    let changed = svc.mark_all_read();
    assert_eq!(changed, 1, "only the still-unread record should count");
    assert_eq!(svc.unread_count(), 0);
}

#[tokio::test]
async fn list_is_sorted_newest_first_and_respects_limit() {
    let (svc, clock, _bcast) = service();
    svc.create("first", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    clock.advance(Duration::from_secs(1));
    svc.create("second", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    clock.advance(Duration::from_secs(1));
    svc.create("third", "m", NotificationLevel::Info, NotificationCategory::System, None, None);

    let all = svc.list(None);
    assert_eq!(all.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(), vec!["third", "second", "first"]);

    let limited = svc.list(Some(2));
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn list_unread_excludes_read_records() {
    let (svc, _clock, _bcast) = service();
    let n1 = svc.create("t1", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    svc.create("t2", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    svc.mark_read(n1.notification_id).unwrap();

    let unread = svc.list_unread(None);
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].title, "t2");
}

#[tokio::test]
async fn delete_removes_a_single_record() {
    let (svc, _clock, _bcast) = service();
    let n = svc.create("t", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    assert!(svc.delete(n.notification_id));
    assert_eq!(svc.count(), 0);
    assert!(!svc.delete(n.notification_id));
}

#[tokio::test]
async fn clear_host_notifications_removes_only_that_hosts_records() {
    let (svc, _clock, _bcast) = service();
    svc.host_unreachable("h1", "timeout");
    svc.host_unreachable("h2", "timeout");

    let removed = svc.clear_host_notifications("h1");
    assert_eq!(removed, 1);
    assert_eq!(svc.count(), 1);
}

#[tokio::test]
async fn cleanup_older_than_removes_only_aged_out_records_and_preserves_unread_state() {
    let (svc, clock, _bcast) = service();
    let stale = svc.create("stale", "m", NotificationLevel::Info, NotificationCategory::System, None, None);
    svc.mark_read(stale.notification_id).unwrap();
    clock.advance(Duration::from_secs(3600));
    let fresh = svc.upsert_system("k", "fresh", "m", NotificationLevel::Info, None);

    let removed = svc.cleanup_older_than(Duration::from_secs(60));
    assert_eq!(removed, 1);
    assert_eq!(svc.count(), 1);
    let remaining = svc.list(None);
    assert_eq!(remaining[0].notification_id, fresh.notification_id);
    assert!(!remaining[0].read, "surviving record's read state must be untouched");
}

#[tokio::test]
async fn job_lifecycle_mutates_a_single_notification_in_place() {
    let (svc, _clock, bcast) = service();
    let job = Job::builder().job_type(JobType::NoopTest).build();

    let pending = svc.job_pending(&job);
    svc.job_running(pending.notification_id, &job).unwrap();
    let completed = svc.job_completed(pending.notification_id, &job).unwrap();
    settle().await;

    assert_eq!(svc.count(), 1, "pending/running/completed must share one record");
    assert_eq!(completed.notification_id, pending.notification_id);
    assert_eq!(completed.level, NotificationLevel::Success);
    assert_eq!(bcast.calls_for_topic("notifications").len(), 3);
}

#[tokio::test]
async fn job_failed_records_the_error_message() {
    let (svc, _clock, _bcast) = service();
    let job = Job::builder().job_type(JobType::ProvisionVm).build();
    let pending = svc.job_pending(&job);

    let failed = svc.job_failed(pending.notification_id, job.job_type, "vm.create: access denied").unwrap();
    assert_eq!(failed.level, NotificationLevel::Error);
    assert_eq!(failed.message, "vm.create: access denied");
}
