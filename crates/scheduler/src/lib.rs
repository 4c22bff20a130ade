// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The remote task scheduler: the single place in the daemon that owns a
//! blocking wait. Callers hand it a synchronous closure (typically a
//! [`hvfleet_transport::RemoteAgent::invoke`] call) and get back a future
//! that resolves once it has run on a dedicated worker pool, timed out, or
//! been discarded as cancelled.
//!
//! Two independent queues exist, each with its own worker pool, rolling
//! average task duration, and scale-up/idle-retire state: [`QueueKind::Short`]
//! for quick, interleavable work, and [`QueueKind::Io`] for long-running
//! guest/disk operations that must never run more than one at a time per
//! host. The per-host constraint lives entirely inside the IO pool as a
//! single-permit gate; it is not a property of the scheduler's public API.

mod error;
mod pool;
mod scheduler;

pub use error::{SchedulerError, TaskCategory};
pub use pool::PoolConfig;
pub use scheduler::{QueueKind, RemoteTaskScheduler, SchedulerConfig};
