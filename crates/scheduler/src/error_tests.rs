// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn task_category_display_is_snake_case() {
    assert_eq!(TaskCategory::Deployment.to_string(), "deployment");
    assert_eq!(TaskCategory::General.to_string(), "general");
}

#[test]
fn scheduler_error_messages_are_descriptive() {
    let timeout: SchedulerError<String> = SchedulerError::Timeout(Duration::from_secs(5));
    assert!(timeout.to_string().contains("timed out"));

    let cancelled: SchedulerError<String> = SchedulerError::Cancelled;
    assert!(cancelled.to_string().contains("cancelled"));

    let panicked: SchedulerError<String> = SchedulerError::Panicked("boom".into());
    assert!(panicked.to_string().contains("boom"));

    let task: SchedulerError<String> = SchedulerError::Task("access denied".into());
    assert!(task.to_string().contains("access denied"));
}
