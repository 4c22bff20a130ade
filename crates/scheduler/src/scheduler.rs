// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::time::{Duration, Instant};

use hvfleet_core::Settings;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::{SchedulerError, TaskCategory};
use crate::pool::{PoolConfig, QueuedTask, WorkerPool};

/// Which logical queue a task runs on. SHORT tasks may interleave freely;
/// IO tasks are serialized per host inside the IO pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Short,
    Io,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub short: PoolConfig,
    pub io: PoolConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { short: PoolConfig::default(), io: PoolConfig::default() }
    }
}

impl SchedulerConfig {
    /// Builds both pool configs from the same set of tunables, matching the
    /// shared `scheduler_*` knobs in [`Settings`] — SHORT and IO differ only
    /// in the per-host serialization, not in sizing.
    pub fn from_settings(settings: &Settings) -> Self {
        let cfg = PoolConfig {
            min_workers: settings.scheduler_min_workers,
            max_workers: settings.scheduler_max_workers,
            idle: settings.scheduler_idle(),
            scale_up_backlog: settings.scheduler_scale_up_backlog,
            scale_up_duration_threshold: settings.scheduler_scale_up_duration_threshold(),
        };
        Self { short: cfg, io: cfg }
    }
}

enum Outcome<T, E> {
    Done(Result<T, E>),
    Panicked(String),
}

/// The single owner of blocking waits in the daemon. Everything else that
/// needs to call into [`hvfleet_transport::RemoteAgent`] or
/// [`hvfleet_transport::SessionFactory`] does so through
/// [`RemoteTaskScheduler::run_blocking`].
pub struct RemoteTaskScheduler {
    short: WorkerPool,
    io: WorkerPool,
}

impl RemoteTaskScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            short: WorkerPool::new(config.short, false),
            io: WorkerPool::new(config.io, true),
        }
    }

    /// Runs `callable` on a dedicated blocking thread, routed onto `queue`.
    ///
    /// - If `cancel` is already cancelled, the task is never enqueued and
    ///   [`SchedulerError::Cancelled`] is returned immediately.
    /// - If `cancel` fires after the task has been dispatched, the result is
    ///   still delivered — cancellation after dispatch is advisory only,
    ///   never a forced termination of the running thread.
    /// - `timeout`, if set, bounds only the caller's wait; the underlying
    ///   thread keeps running to completion even after a timeout error is
    ///   returned.
    pub async fn run_blocking<T, E, F>(
        &self,
        hostname: &str,
        queue: QueueKind,
        category: TaskCategory,
        description: impl Into<String>,
        timeout: Option<Duration>,
        cancel: CancellationToken,
        callable: F,
    ) -> Result<T, SchedulerError<E>>
    where
        T: Send + 'static,
        E: Send + fmt::Display + fmt::Debug + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }

        let (tx, rx) = tokio::sync::oneshot::channel::<Outcome<T, E>>();
        let description = description.into();
        let run = Box::new(move || {
            Box::pin(async move {
                if cancel.is_cancelled() {
                    return None; // discarded: tx drops without sending
                }
                let started = Instant::now();
                let joined = tokio::task::spawn_blocking(callable).await;
                let elapsed = started.elapsed();
                let outcome = match joined {
                    Ok(result) => Outcome::Done(result),
                    Err(join_err) => Outcome::Panicked(join_err.to_string()),
                };
                let _ = tx.send(outcome);
                Some(elapsed)
            }) as crate::pool::BoxFuture<Option<Duration>>
        });

        let task = QueuedTask { hostname: hostname.to_string(), description, run };
        match queue {
            QueueKind::Short => self.short.submit(task),
            QueueKind::Io => self.io.submit(task),
        }
        trace!(%hostname, %category, "task enqueued");

        let received = match timeout {
            Some(t) => match tokio::time::timeout(t, rx).await {
                Ok(inner) => inner,
                Err(_elapsed) => return Err(SchedulerError::Timeout(t)),
            },
            None => rx.await,
        };

        match received {
            Ok(Outcome::Done(Ok(v))) => Ok(v),
            Ok(Outcome::Done(Err(e))) => Err(SchedulerError::Task(e)),
            Ok(Outcome::Panicked(msg)) => {
                warn!(message = %msg, "remote task panicked");
                Err(SchedulerError::Panicked(msg))
            }
            // The sender was dropped without sending: either discarded
            // pre-dispatch because `cancel` fired, or the pool was torn
            // down mid-flight. Either way the caller sees "cancelled".
            Err(_recv_error) => Err(SchedulerError::Cancelled),
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
