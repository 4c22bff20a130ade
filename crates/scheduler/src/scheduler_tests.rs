// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pool::PoolConfig;
use hvfleet_transport::{FakeRemoteAgent, FakeSession, NullSink, RemoteAgent};
use hvfleet_wire::create_job_request;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn small_scheduler() -> RemoteTaskScheduler {
    let cfg = PoolConfig { min_workers: 2, max_workers: 4, ..Default::default() };
    RemoteTaskScheduler::new(SchedulerConfig { short: cfg, io: cfg })
}

#[tokio::test]
async fn successful_callable_returns_its_value() {
    let scheduler = small_scheduler();
    let result: Result<u32, String> = scheduler
        .run_blocking(
            "host01",
            QueueKind::Short,
            TaskCategory::General,
            "noop",
            None,
            CancellationToken::new(),
            || Ok(42),
        )
        .await;
    assert_eq!(result.unwrap(), 42);
}

#[tokio::test]
async fn failing_callable_surfaces_as_task_error() {
    let scheduler = small_scheduler();
    let result: Result<u32, String> = scheduler
        .run_blocking(
            "host01",
            QueueKind::Short,
            TaskCategory::Job,
            "fails",
            None,
            CancellationToken::new(),
            || Err("agent unreachable".to_string()),
        )
        .await;
    assert!(matches!(result, Err(SchedulerError::Task(msg)) if msg == "agent unreachable"));
}

#[tokio::test]
async fn pre_cancelled_token_skips_dispatch_entirely() {
    let scheduler = small_scheduler();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let ran_clone = ran.clone();
    let result: Result<(), String> = scheduler
        .run_blocking(
            "host01",
            QueueKind::Io,
            TaskCategory::Deployment,
            "should not run",
            None,
            cancel,
            move || {
                ran_clone.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            },
        )
        .await;
    assert!(matches!(result, Err(SchedulerError::Cancelled)));
    assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn timeout_elapses_before_a_slow_callable_finishes() {
    let scheduler = small_scheduler();
    let result: Result<(), String> = scheduler
        .run_blocking(
            "host01",
            QueueKind::Short,
            TaskCategory::General,
            "slow",
            Some(Duration::from_millis(20)),
            CancellationToken::new(),
            || {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            },
        )
        .await;
    assert!(matches!(result, Err(SchedulerError::Timeout(_))));
}

#[tokio::test]
async fn panicking_callable_is_reported_not_propagated() {
    let scheduler = small_scheduler();
    let result: Result<(), String> = scheduler
        .run_blocking(
            "host01",
            QueueKind::Short,
            TaskCategory::General,
            "panics",
            None,
            CancellationToken::new(),
            || -> Result<(), String> { panic!("agent crashed") },
        )
        .await;
    assert!(matches!(result, Err(SchedulerError::Panicked(_))));
}

#[tokio::test]
async fn io_queue_serializes_tasks_for_the_same_host() {
    let scheduler = Arc::new(small_scheduler());
    let active = Arc::new(parking_lot::Mutex::new(false));
    let overlapped = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let scheduler = scheduler.clone();
        let active = active.clone();
        let overlapped = overlapped.clone();
        handles.push(tokio::spawn(async move {
            let result: Result<(), String> = scheduler
                .run_blocking(
                    "shared-host",
                    QueueKind::Io,
                    TaskCategory::Inventory,
                    "disk.create",
                    None,
                    CancellationToken::new(),
                    move || {
                        {
                            let mut a = active.lock();
                            if *a {
                                overlapped.store(true, std::sync::atomic::Ordering::SeqCst);
                            }
                            *a = true;
                        }
                        std::thread::sleep(Duration::from_millis(10));
                        *active.lock() = false;
                        Ok(())
                    },
                )
                .await;
            result
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }
    assert!(!overlapped.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn scheduler_runs_a_real_remote_agent_invocation_off_its_own_thread() {
    let scheduler = small_scheduler();
    let agent = FakeRemoteAgent::new();
    let request = create_job_request("vm.create", serde_json::json!({"name": "vm01"}), None, None);
    let session = FakeSession::new("host01");

    let request_for_call = request.clone();
    let result = scheduler
        .run_blocking(
            "host01",
            QueueKind::Io,
            TaskCategory::Deployment,
            "vm.create",
            None,
            CancellationToken::new(),
            move || agent.invoke(&session, &request_for_call, &NullSink, None),
        )
        .await;

    let envelope = result.unwrap();
    assert_eq!(envelope.correlation_id, request.correlation_id);
}
