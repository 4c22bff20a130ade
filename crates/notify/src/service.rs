// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The notification table: one writer lock, upsert semantics on a stable
//! `related_entity` key for `system`-category records, and a WebSocket
//! broadcast fired (but never awaited by the caller) on every mutation.

use std::sync::Arc;
use std::time::Duration;

use hvfleet_core::{
    Broadcaster, Clock, Job, JobType, Notification, NotificationCategory, NotificationId, NotificationLevel,
    SystemClock,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::NotifyError;

const TOPIC: &str = "notifications";

/// Owns every [`Notification`] in the process. See module docs for the
/// locking/broadcast contract.
pub struct NotificationService<C: Clock = SystemClock> {
    clock: C,
    broadcaster: Arc<dyn Broadcaster>,
    table: Mutex<IndexMap<NotificationId, Notification>>,
}

impl<C: Clock> NotificationService<C> {
    pub fn new(clock: C, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { clock, broadcaster, table: Mutex::new(IndexMap::new()) }
    }

    /// Allocate, store, and broadcast a plain (non-upsert) notification.
    pub fn create(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        level: NotificationLevel,
        category: NotificationCategory,
        related_entity: Option<String>,
        metadata: Option<Value>,
    ) -> Notification {
        let mut notification = Notification::new(level, category, title, message, self.clock.now_utc());
        if let Some(key) = related_entity {
            notification = notification.with_related_entity(key);
        }
        if let Some(meta) = metadata {
            notification = notification.with_metadata(meta);
        }
        self.table.lock().insert(notification.notification_id, notification.clone());
        self.spawn_broadcast("created", &notification);
        notification
    }

    /// Create-or-mutate-in-place a `system`-category notification keyed by
    /// `key`. Preserves `notification_id`/`created_at` across repeated
    /// calls with the same key; every other field is overwritten and the
    /// record is surfaced as unread again.
    pub fn upsert_system(
        &self,
        key: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        level: NotificationLevel,
        metadata: Option<Value>,
    ) -> Notification {
        self.upsert_keyed(NotificationCategory::System, key, title, message, level, metadata)
    }

    /// Same create-or-mutate-in-place contract as [`Self::upsert_system`] but
    /// for an arbitrary category, keyed on `(category, related_entity)`
    /// rather than `related_entity` alone — used for `host`-category
    /// connectivity transitions, which must stay distinguishable from
    /// `system` notifications sharing the same hostname-derived key.
    fn upsert_keyed(
        &self,
        category: NotificationCategory,
        key: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        level: NotificationLevel,
        metadata: Option<Value>,
    ) -> Notification {
        let candidate = Notification::new(level, category, title, message, self.clock.now_utc())
            .with_related_entity(key.into())
            .with_metadata(metadata.unwrap_or(Value::Null));
        let (notification, was_update) = self.upsert(candidate);
        self.spawn_broadcast(if was_update { "updated" } else { "created" }, &notification);
        notification
    }

    fn upsert(&self, mut candidate: Notification) -> (Notification, bool) {
        let mut table = self.table.lock();
        let existing_id = table
            .values()
            .find(|n| n.category == candidate.category && n.related_entity == candidate.related_entity)
            .map(|n| n.notification_id);
        match existing_id {
            Some(id) => {
                if let Some(existing) = table.get(&id) {
                    candidate.notification_id = id;
                    candidate.created_at = existing.created_at;
                }
                table.insert(id, candidate.clone());
                (candidate, true)
            }
            None => {
                table.insert(candidate.notification_id, candidate.clone());
                (candidate, false)
            }
        }
    }

    /// Remove the `system`-category record upserted under `key`, if any.
    pub fn clear_system(&self, key: &str) -> bool {
        let id = {
            let table = self.table.lock();
            table
                .values()
                .find(|n| n.category == NotificationCategory::System && n.related_entity.as_deref() == Some(key))
                .map(|n| n.notification_id)
        };
        match id {
            Some(id) => {
                self.table.lock().shift_remove(&id);
                true
            }
            None => false,
        }
    }

    /// Mutate an existing notification's display fields in place, e.g. the
    /// single per-job notification the job service tracks via
    /// [`Job::notification_id`](hvfleet_core::Job) across its whole
    /// lifecycle (pending → running → terminal). Preserves `id`,
    /// `created_at`, `category`, and `related_entity`; resets `read` to
    /// `false` since a mutated notification is, by definition, new news.
    pub fn update(
        &self,
        id: NotificationId,
        title: impl Into<String>,
        message: impl Into<String>,
        level: NotificationLevel,
    ) -> Result<Notification, NotifyError> {
        let updated = {
            let mut table = self.table.lock();
            match table.get_mut(&id) {
                Some(n) => {
                    n.title = title.into();
                    n.message = message.into();
                    n.level = level;
                    n.read = false;
                    Some(n.clone())
                }
                None => None,
            }
        };
        match updated {
            Some(n) => {
                self.spawn_broadcast("updated", &n);
                Ok(n)
            }
            None => Err(NotifyError::NotFound(id)),
        }
    }

    pub fn mark_read(&self, id: NotificationId) -> Result<(), NotifyError> {
        let unread_count = {
            let mut table = self.table.lock();
            let found = table.get_mut(&id).map(|n| n.read = true);
            if found.is_none() {
                return Err(NotifyError::NotFound(id));
            }
            table.values().filter(|n| !n.read).count()
        };
        self.spawn_broadcast_update(serde_json::json!({
            "notification_id": id,
            "read": true,
            "unread_count": unread_count,
        }));
        Ok(())
    }

    /// Marks every unread notification read; returns how many changed.
    pub fn mark_all_read(&self) -> usize {
        let changed = {
            let mut table = self.table.lock();
            let mut changed = 0usize;
            for n in table.values_mut() {
                if !n.read {
                    n.read = true;
                    changed += 1;
                }
            }
            changed
        };
        if changed > 0 {
            self.spawn_broadcast_update(serde_json::json!({ "all": true, "unread_count": 0 }));
        }
        changed
    }

    /// Every notification, newest first, optionally truncated to `limit`.
    pub fn list(&self, limit: Option<usize>) -> Vec<Notification> {
        self.list_filtered(limit, |_| true)
    }

    pub fn list_unread(&self, limit: Option<usize>) -> Vec<Notification> {
        self.list_filtered(limit, |n| !n.read)
    }

    fn list_filtered(&self, limit: Option<usize>, predicate: impl Fn(&Notification) -> bool) -> Vec<Notification> {
        let table = self.table.lock();
        let mut out: Vec<Notification> = table.values().filter(|n| predicate(n)).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        out
    }

    pub fn delete(&self, id: NotificationId) -> bool {
        self.table.lock().shift_remove(&id).is_some()
    }

    pub fn count(&self) -> usize {
        self.table.lock().len()
    }

    pub fn unread_count(&self) -> usize {
        self.table.lock().values().filter(|n| !n.read).count()
    }

    /// Bulk-remove `host`-category notifications for a decommissioned host.
    pub fn clear_host_notifications(&self, hostname: &str) -> usize {
        let key = hvfleet_core::host_key(hostname);
        let mut table = self.table.lock();
        let ids: Vec<NotificationId> = table
            .values()
            .filter(|n| n.category == NotificationCategory::HostConnectivity && n.related_entity.as_deref() == Some(key.as_str()))
            .map(|n| n.notification_id)
            .collect();
        for id in &ids {
            table.shift_remove(id);
        }
        ids.len()
    }

    /// Removes every notification whose `created_at` is older than
    /// `max_age`. Driven by the same periodic janitor that sweeps terminal
    /// jobs; the caller decides whether `max_age == 0` means "skip".
    pub fn cleanup_older_than(&self, max_age: Duration) -> usize {
        let cutoff = self.clock.now_utc() - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
        let mut table = self.table.lock();
        let ids: Vec<NotificationId> = table.values().filter(|n| n.created_at < cutoff).map(|n| n.notification_id).collect();
        for id in &ids {
            table.shift_remove(id);
        }
        if !ids.is_empty() {
            debug!(removed = ids.len(), "notification retention sweep");
        }
        ids.len()
    }

    /// Standard host-unreachable upsert, as raised by the inventory service
    /// on a reachable→unreachable transition.
    pub fn host_unreachable(&self, hostname: &str, error: impl Into<String>) -> Notification {
        let error = error.into();
        self.upsert_keyed(
            NotificationCategory::HostConnectivity,
            hvfleet_core::host_key(hostname),
            format!("Host {hostname} unreachable"),
            error,
            NotificationLevel::Warning,
            None,
        )
    }

    /// Standard host-reconnected upsert, as raised by the inventory service
    /// on an unreachable→reachable transition.
    pub fn host_reconnected(&self, hostname: &str) -> Notification {
        self.upsert_keyed(
            NotificationCategory::HostConnectivity,
            hvfleet_core::host_key(hostname),
            format!("Host {hostname} reconnected"),
            format!("{hostname} is responding to inventory refresh again."),
            NotificationLevel::Info,
            None,
        )
    }

    /// The initial notification raised on `submit`, before a job has a
    /// `notification_id` of its own. The caller stores the returned id
    /// back onto the job record so every later transition can use
    /// [`NotificationService::update`] on this same notification instead
    /// of creating a new one per transition.
    pub fn job_pending(&self, job: &Job) -> Notification {
        self.create(
            format!("Job {} submitted", job.job_type),
            format!("Job {} is pending.", job.job_id),
            NotificationLevel::Info,
            NotificationCategory::Job,
            Some(hvfleet_core::job_key(job.job_id)),
            None,
        )
    }

    pub fn job_running(&self, notification_id: NotificationId, job: &Job) -> Result<Notification, NotifyError> {
        self.update(
            notification_id,
            format!("Job {} running", job.job_type),
            format!("Job {} is running.", job.job_id),
            NotificationLevel::Info,
        )
    }

    /// Standard job-completed update, as raised by the job service on a
    /// `completed` terminal transition.
    pub fn job_completed(&self, notification_id: NotificationId, job: &Job) -> Result<Notification, NotifyError> {
        self.update(
            notification_id,
            format!("Job {} completed", job.job_type),
            format!("Job {} finished successfully.", job.job_id),
            NotificationLevel::Success,
        )
    }

    /// Mirrors [`NotificationService::job_completed`] but for the `failed`
    /// terminal transition, so operators see failures in the same feed.
    pub fn job_failed(
        &self,
        notification_id: NotificationId,
        job_type: JobType,
        error: &str,
    ) -> Result<Notification, NotifyError> {
        self.update(notification_id, format!("Job {job_type} failed"), error.to_string(), NotificationLevel::Error)
    }

    fn spawn_broadcast(&self, action: &str, notification: &Notification) {
        let payload = serde_json::json!({
            "type": "notification",
            "action": action,
            "data": notification,
        });
        self.fire(payload);
    }

    fn spawn_broadcast_update(&self, data: Value) {
        let payload = serde_json::json!({
            "type": "notification",
            "action": "updated",
            "data": data,
        });
        self.fire(payload);
    }

    fn fire(&self, payload: Value) {
        let broadcaster = self.broadcaster.clone();
        tokio::spawn(async move {
            broadcaster.broadcast(Some(TOPIC.to_string()), payload).await;
        });
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
