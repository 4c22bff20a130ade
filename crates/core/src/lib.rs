// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hvfleet-core: shared data model for the fleet control plane.
//!
//! Job records, inventory types, notifications, and typed configuration,
//! plus the small utility modules (clock abstraction, UUID ID macro,
//! test-builder macros) the rest of the workspace builds on.

#[macro_use]
pub mod macros;

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod id;
pub mod inventory;
pub mod job;
pub mod notification;

#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
#[cfg(any(test, feature = "test-support"))]
pub use notification::NotificationBuilder;

#[cfg(any(test, feature = "test-support"))]
pub use broadcast::fake::RecordingBroadcaster;
pub use broadcast::{Broadcaster, NullBroadcaster};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, Settings};
pub use id::short;
pub use inventory::{Cluster, Host, HostConnectionState, HostResources, Vm, VmOsFamily, VmPowerState};
pub use job::{ChildJobRef, Job, JobId, JobStatus, JobType, REDACTED_PLACEHOLDER, SENSITIVE_FIELD_MARKERS};
pub use notification::{host_key, job_key, Notification, NotificationCategory, NotificationId, NotificationLevel};
