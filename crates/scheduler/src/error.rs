// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;
use thiserror::Error;

/// The label a caller attaches to a scheduled task. Carried through for
/// logging only — queue routing is the caller's explicit [`crate::QueueKind`]
/// choice, not derived from the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskCategory {
    Deployment,
    Inventory,
    Job,
    General,
}

hvfleet_core::simple_display! {
    TaskCategory {
        Deployment => "deployment",
        Inventory => "inventory",
        Job => "job",
        General => "general",
    }
}

/// Everything that can go wrong running a task through the scheduler,
/// parameterized over the caller's own callable error type `E`.
#[derive(Debug, Error)]
pub enum SchedulerError<E: std::fmt::Display + std::fmt::Debug> {
    #[error("remote task timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote task was cancelled before it began running")]
    Cancelled,
    #[error("remote task panicked: {0}")]
    Panicked(String),
    #[error("remote task failed: {0}")]
    Task(E),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
