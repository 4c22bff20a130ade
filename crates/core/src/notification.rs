// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-facing notifications: host connectivity changes, job
//! completions, and anything else worth surfacing in the UI feed.

use crate::define_uuid_id;
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Identifies a single notification.
    pub struct NotificationId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

crate::simple_display! {
    NotificationLevel {
        Info => "info",
        Warning => "warning",
        Error => "error",
        Success => "success",
    }
}

/// Groups notifications for targeted clearing (e.g. all notifications tied
/// to one host get cleared together when that host is removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    System,
    HostConnectivity,
    Vm,
    Job,
    Authentication,
}

crate::simple_display! {
    NotificationCategory {
        System => "system",
        HostConnectivity => "host",
        Vm => "vm",
        Job => "job",
        Authentication => "authentication",
    }
}

/// A notification, identified by `notification_id`.
///
/// `related_entity` is the stable upsert key used by category=`system`
/// upserts (see `hvfleet-notify::NotificationService::upsert_system`);
/// other categories set it for grouped bulk-clear (e.g. all `host`
/// notifications for a given hostname) but don't upsert on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: NotificationId,
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub host: Option<String>,
    pub job_id: Option<crate::job::JobId>,
    pub related_entity: Option<String>,
    #[serde(default = "serde_json::Value::default")]
    pub metadata: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            notification_id: NotificationId::new(),
            level,
            category,
            title: title.into(),
            message: message.into(),
            host: None,
            job_id: None,
            related_entity: None,
            metadata: serde_json::Value::Null,
            created_at: now,
            read: false,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_job(mut self, job_id: crate::job::JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_related_entity(mut self, key: impl Into<String>) -> Self {
        self.related_entity = Some(key.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// A host has stopped responding to WinRM probes.
    pub fn host_unreachable(host: impl Into<String>, detail: impl Into<String>, now: chrono::DateTime<chrono::Utc>) -> Self {
        let host = host.into();
        Self::new(
            NotificationLevel::Warning,
            NotificationCategory::HostConnectivity,
            format!("Host {host} unreachable"),
            detail.into(),
            now,
        )
        .with_host(host.clone())
        .with_related_entity(host_key(&host))
    }

    /// A previously-unreachable host has started responding again.
    pub fn host_reconnected(host: impl Into<String>, now: chrono::DateTime<chrono::Utc>) -> Self {
        let host = host.into();
        Self::new(
            NotificationLevel::Info,
            NotificationCategory::HostConnectivity,
            format!("Host {host} reconnected"),
            format!("{host} is responding to inventory refresh again."),
            now,
        )
        .with_host(host.clone())
        .with_related_entity(host_key(&host))
    }

    pub fn job_completed(job_id: crate::job::JobId, job_type: crate::job::JobType, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self::new(
            NotificationLevel::Info,
            NotificationCategory::Job,
            format!("Job {job_type} completed"),
            format!("Job {job_id} finished successfully."),
            now,
        )
        .with_job(job_id)
        .with_related_entity(job_key(job_id))
    }
}

/// Upsert key for host-category notifications: stable across repeated
/// connect/disconnect transitions for the same host.
pub fn host_key(hostname: &str) -> String {
    format!("host:{hostname}")
}

/// Upsert key for the pending/running/terminal notification a job
/// publishes across its own lifecycle.
pub fn job_key(job_id: crate::job::JobId) -> String {
    format!("job:{job_id}")
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct NotificationBuilder => Notification {
        set { notification_id: NotificationId = NotificationId::new() }
        set { level: NotificationLevel = NotificationLevel::Info }
        set { category: NotificationCategory = NotificationCategory::System }
        into { title: String = "test notification" }
        into { message: String = "test message" }
        option { host: String = None }
        option { job_id: crate::job::JobId = None }
        option { related_entity: String = None }
        set { metadata: serde_json::Value = serde_json::Value::Null }
        set { created_at: chrono::DateTime<chrono::Utc> = chrono::Utc::now() }
        set { read: bool = false }
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
