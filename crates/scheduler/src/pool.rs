// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A dynamically-sized async worker pool backing one logical queue.
//!
//! Tasks are plain `Box<dyn FnOnce() -> BoxFuture<Option<Duration>>>` —
//! fully self-contained units that check cancellation, run their payload on
//! [`tokio::task::spawn_blocking`], and deliver their own result through a
//! channel the caller already holds. The pool never sees `T`/`E`; it only
//! ever schedules and times these opaque futures, which keeps [`WorkerPool`]
//! itself non-generic.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, trace};

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub(crate) struct QueuedTask {
    pub hostname: String,
    pub description: String,
    pub run: Box<dyn FnOnce() -> BoxFuture<Option<Duration>> + Send>,
}

/// Sizing and scale knobs for one [`WorkerPool`]. Mirrors
/// `hvfleet_core::config::Settings`'s `scheduler_*` fields.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub idle: Duration,
    pub scale_up_backlog: usize,
    pub scale_up_duration_threshold: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 16,
            idle: Duration::from_secs(60),
            scale_up_backlog: 4,
            scale_up_duration_threshold: Duration::from_secs(5),
        }
    }
}

#[derive(Default)]
struct Metrics {
    workers: usize,
    queued: usize,
    rolling_avg: Duration,
    samples: u64,
}

impl Metrics {
    fn record(&mut self, elapsed: Duration) {
        if self.samples == 0 {
            self.rolling_avg = elapsed;
        } else {
            self.rolling_avg = self.rolling_avg.mul_f64(0.8) + elapsed.mul_f64(0.2);
        }
        self.samples += 1;
    }

    fn eligible_for_scale_up(&self, cfg: &PoolConfig) -> bool {
        self.workers < cfg.max_workers
            && self.queued >= cfg.scale_up_backlog
            && (self.samples == 0 || self.rolling_avg < cfg.scale_up_duration_threshold)
    }
}

/// One host's in-flight gate: at most one queued task for a given host runs
/// at a time. Only used by the IO pool; `None` for the SHORT pool, which
/// imposes no per-host constraint.
type HostGate = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// A dynamically-sized pool of async workers draining one FIFO queue.
///
/// Workers share a single [`tokio::sync::mpsc`] receiver behind an async
/// mutex, so dequeuing is strictly FIFO even with many workers competing:
/// only the worker currently holding the receiver lock can observe the next
/// item, and that lock is held across the `recv().await` itself.
pub(crate) struct WorkerPool {
    tx: mpsc::UnboundedSender<QueuedTask>,
    metrics: Arc<Mutex<Metrics>>,
    host_gate: Option<HostGate>,
}

impl WorkerPool {
    /// Spawns `config.min_workers` workers and a background scaler task.
    /// `serialize_per_host` enables the IO pool's single-permit-per-host
    /// gate; the SHORT pool passes `false`.
    pub fn new(config: PoolConfig, serialize_per_host: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<QueuedTask>();
        let rx = Arc::new(AsyncMutex::new(rx));
        let metrics = Arc::new(Mutex::new(Metrics::default()));
        let host_gate: Option<HostGate> = serialize_per_host.then(|| Arc::new(Mutex::new(HashMap::new())));

        for _ in 0..config.min_workers {
            spawn_worker(rx.clone(), metrics.clone(), host_gate.clone(), config);
        }
        metrics.lock().workers = config.min_workers;

        spawn_scaler(rx, metrics.clone(), host_gate.clone(), config);

        Self { tx, metrics, host_gate }
    }

    /// Enqueue a task. The caller is responsible for having already wired
    /// cancellation/timeout handling into `run`'s closure.
    pub fn submit(&self, task: QueuedTask) {
        self.metrics.lock().queued += 1;
        // An unbounded sender only errs if every receiver has dropped,
        // which only happens if the pool itself has been torn down.
        let _ = self.tx.send(task);
    }

    #[cfg(test)]
    pub fn worker_count(&self) -> usize {
        self.metrics.lock().workers
    }

    #[cfg(test)]
    pub fn queued_count(&self) -> usize {
        self.metrics.lock().queued
    }
}

fn spawn_worker(
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<QueuedTask>>>,
    metrics: Arc<Mutex<Metrics>>,
    host_gate: Option<HostGate>,
    config: PoolConfig,
) {
    tokio::spawn(async move {
        loop {
            let received = {
                let mut guard = rx.lock().await;
                tokio::time::timeout(config.idle, guard.recv()).await
            };
            let task = match received {
                Ok(Some(task)) => task,
                Ok(None) => break, // pool dropped, channel closed
                Err(_elapsed) => {
                    let mut m = metrics.lock();
                    if m.workers > config.min_workers {
                        m.workers -= 1;
                        trace!(workers = m.workers, "worker retired after idle timeout");
                        break;
                    }
                    continue;
                }
            };
            metrics.lock().queued -= 1;

            let _host_permit = if let Some(gate) = &host_gate {
                let cell = {
                    let mut gates = gate.lock();
                    gates.entry(task.hostname.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
                };
                Some(cell.lock_owned().await)
            } else {
                None
            };

            debug!(hostname = %task.hostname, description = %task.description, "running scheduled task");
            if let Some(elapsed) = (task.run)().await {
                metrics.lock().record(elapsed);
            }
        }
    });
}

fn spawn_scaler(
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<QueuedTask>>>,
    metrics: Arc<Mutex<Metrics>>,
    host_gate: Option<HostGate>,
    config: PoolConfig,
) {
    let tick = {
        let quarter_idle = config.idle / 4;
        let floor = Duration::from_millis(200);
        if quarter_idle > floor {
            quarter_idle
        } else {
            floor
        }
    };
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(tick).await;
            if Arc::strong_count(&rx) == 1 {
                break; // pool dropped
            }
            let should_scale = {
                let m = metrics.lock();
                m.eligible_for_scale_up(&config)
            };
            if should_scale {
                spawn_worker(rx.clone(), metrics.clone(), host_gate.clone(), config);
                let mut m = metrics.lock();
                m.workers += 1;
                debug!(workers = m.workers, "scaled up worker pool");
            }
        }
    });
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
