// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The inventory refresh loop: per-host collection, an epoch guard against a
//! late-returning slow refresh overwriting a newer one, and cluster
//! aggregation once every per-host application has committed.
//!
//! Follows the same locking/spawn shape as [`hvfleet_jobs::JobService`]: a
//! cloneable [`Shared`] handle, mutate-under-lock then drop the lock before
//! any notification, and background work spawned as a free function.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hvfleet_core::{Broadcaster, Clock, Cluster, Host, SystemClock, Vm};
use hvfleet_notify::NotificationService;
use hvfleet_scheduler::{QueueKind, RemoteTaskScheduler, TaskCategory};
use hvfleet_transport::{NullSink, RemoteAgent, SessionCache, SessionFactory};
use hvfleet_wire::{create_job_request, ResultStatus};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::deploy::{ArtifactDeployer, NullArtifactDeployer};
use crate::error::InventoryError;
use crate::snapshot::{parse_host_snapshot, HostSnapshot};

const CLUSTER_NAME: &str = "default";

struct HostState {
    host: Host,
    vms: IndexMap<String, Vm>,
    epoch: u64,
}

struct HostSlot {
    state: Mutex<HostState>,
    next_epoch: AtomicU64,
    in_flight: tokio::sync::Mutex<()>,
}

struct Shared<C: Clock> {
    clock: C,
    scheduler: Arc<RemoteTaskScheduler>,
    sessions: Arc<SessionCache<Arc<dyn SessionFactory>>>,
    agent: Arc<dyn RemoteAgent>,
    notify: Arc<NotificationService<C>>,
    #[allow(dead_code)]
    broadcaster: Arc<dyn Broadcaster>,
    deployer: Arc<dyn ArtifactDeployer>,
    deploy_enabled: bool,
    agent_startup_concurrency: usize,
    target_hosts: Vec<String>,
    hosts: Arc<Mutex<IndexMap<String, Arc<HostSlot>>>>,
    cluster: Arc<Mutex<Cluster>>,
    last_refresh: Arc<Mutex<Option<chrono::DateTime<chrono::Utc>>>>,
}

impl<C: Clock> Clone for Shared<C> {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            scheduler: self.scheduler.clone(),
            sessions: self.sessions.clone(),
            agent: self.agent.clone(),
            notify: self.notify.clone(),
            broadcaster: self.broadcaster.clone(),
            deployer: self.deployer.clone(),
            deploy_enabled: self.deploy_enabled,
            agent_startup_concurrency: self.agent_startup_concurrency,
            target_hosts: self.target_hosts.clone(),
            hosts: self.hosts.clone(),
            cluster: self.cluster.clone(),
            last_refresh: self.last_refresh.clone(),
        }
    }
}

/// Owns the host/VM/cluster tables. See module docs for the locking
/// contract.
pub struct InventoryService<C: Clock = SystemClock> {
    shared: Shared<C>,
}

impl<C: Clock> InventoryService<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: C,
        scheduler: Arc<RemoteTaskScheduler>,
        sessions: Arc<SessionCache<Arc<dyn SessionFactory>>>,
        agent: Arc<dyn RemoteAgent>,
        notify: Arc<NotificationService<C>>,
        broadcaster: Arc<dyn Broadcaster>,
        deployer: Option<Arc<dyn ArtifactDeployer>>,
        agent_startup_concurrency: usize,
        target_hosts: Vec<String>,
    ) -> Self {
        let deploy_enabled = deployer.is_some();
        let deployer = deployer.unwrap_or_else(|| Arc::new(NullArtifactDeployer));
        let mut hosts = IndexMap::new();
        for hostname in &target_hosts {
            hosts.insert(
                hostname.clone(),
                Arc::new(HostSlot {
                    state: Mutex::new(HostState { host: Host::new(hostname.clone()), vms: IndexMap::new(), epoch: 0 }),
                    next_epoch: AtomicU64::new(0),
                    in_flight: tokio::sync::Mutex::new(()),
                }),
            );
        }
        Self {
            shared: Shared {
                clock,
                scheduler,
                sessions,
                agent,
                notify,
                broadcaster,
                deployer,
                deploy_enabled,
                agent_startup_concurrency: agent_startup_concurrency.max(1),
                target_hosts,
                hosts: Arc::new(Mutex::new(hosts)),
                cluster: Arc::new(Mutex::new(Cluster::from_connected_hosts(CLUSTER_NAME, &[]))),
                last_refresh: Arc::new(Mutex::new(None)),
            },
        }
    }

    /// Runs the pre-refresh artifact deployment (if a backend is
    /// configured) and then a full refresh cycle, bounding only the wait —
    /// the cycle itself keeps running in the background past `budget` so a
    /// slow first cycle still eventually makes the service ready.
    pub async fn run_startup(&self, budget: Duration) {
        if self.shared.deploy_enabled {
            self.deploy_artifacts().await;
        }
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move { refresh_cycle(&shared).await });
        let _ = tokio::time::timeout(budget, handle).await;
    }

    /// Deploys the agent artifact bundle to every configured host, bounded
    /// by `agent_startup_concurrency` parallel deployments. Individual
    /// failures are logged and never block the rest of the fleet.
    pub async fn deploy_artifacts(&self) {
        if self.shared.target_hosts.is_empty() {
            return;
        }
        let semaphore = Arc::new(Semaphore::new(self.shared.agent_startup_concurrency));
        let mut handles = Vec::new();
        for hostname in self.shared.target_hosts.clone() {
            let shared = self.shared.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else { return };
                let deployer = shared.deployer.clone();
                let target = hostname.clone();
                let result = shared
                    .scheduler
                    .run_blocking(
                        &hostname,
                        QueueKind::Io,
                        TaskCategory::Deployment,
                        format!("deploy agent artifacts to {hostname}"),
                        None,
                        CancellationToken::new(),
                        move || deployer.deploy(&target),
                    )
                    .await;
                if let Err(e) = result {
                    warn!(hostname = %hostname, error = %e, "agent artifact deployment failed; host will show disconnected on first refresh");
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// One full refresh: every configured host collected concurrently
    /// (per-host in-flight guard skips a host whose prior refresh hasn't
    /// returned yet), then the cluster recomputed from the result.
    pub async fn refresh_cycle(&self) {
        refresh_cycle(&self.shared).await;
    }

    pub fn is_ready(&self) -> bool {
        self.shared.last_refresh.lock().is_some()
    }

    pub fn last_refresh(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        *self.shared.last_refresh.lock()
    }

    pub fn list_hosts(&self) -> Vec<Host> {
        self.shared.hosts.lock().values().map(|slot| slot.state.lock().host.clone()).collect()
    }

    pub fn get_host(&self, hostname: &str) -> Result<Host, InventoryError> {
        let hosts = self.shared.hosts.lock();
        let slot = hosts.get(hostname).ok_or_else(|| InventoryError::UnknownHost(hostname.to_string()))?;
        Ok(slot.state.lock().host.clone())
    }

    pub fn list_vms(&self) -> Vec<Vm> {
        self.shared.hosts.lock().values().flat_map(|slot| slot.state.lock().vms.values().cloned().collect::<Vec<_>>()).collect()
    }

    pub fn list_vms_for_host(&self, hostname: &str) -> Result<Vec<Vm>, InventoryError> {
        let hosts = self.shared.hosts.lock();
        let slot = hosts.get(hostname).ok_or_else(|| InventoryError::UnknownHost(hostname.to_string()))?;
        Ok(slot.state.lock().vms.values().cloned().collect())
    }

    pub fn get_vm(&self, hostname: &str, name: &str) -> Option<Vm> {
        let hosts = self.shared.hosts.lock();
        hosts.get(hostname).and_then(|slot| slot.state.lock().vms.get(name).cloned())
    }

    pub fn get_vm_by_id(&self, vm_id: &str) -> Option<Vm> {
        let hosts = self.shared.hosts.lock();
        hosts.values().find_map(|slot| slot.state.lock().vms.values().find(|v| v.vm_id.as_deref() == Some(vm_id)).cloned())
    }

    pub fn cluster(&self) -> Cluster {
        self.shared.cluster.lock().clone()
    }
}

async fn refresh_cycle<C: Clock>(shared: &Shared<C>) {
    if shared.target_hosts.is_empty() {
        shared.hosts.lock().clear();
        *shared.cluster.lock() = Cluster::from_connected_hosts(CLUSTER_NAME, &[]);
        *shared.last_refresh.lock() = Some(shared.clock.now_utc());
        return;
    }

    let mut handles = Vec::new();
    for hostname in shared.target_hosts.clone() {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move { collect_and_apply(&shared, &hostname).await }));
    }
    for handle in handles {
        let _ = handle.await;
    }

    recompute_cluster(shared);
    *shared.last_refresh.lock() = Some(shared.clock.now_utc());
}

/// Collects one host's snapshot and applies it, guarded by that host's
/// in-flight lock so an overlapping cycle skips a host whose prior refresh
/// hasn't returned yet rather than piling up a second collection.
async fn collect_and_apply<C: Clock>(shared: &Shared<C>, hostname: &str) {
    let slot = { shared.hosts.lock().get(hostname).cloned() };
    let Some(slot) = slot else { return };

    let _guard = match slot.in_flight.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            trace!(%hostname, "inventory refresh already in flight, skipping this cycle");
            return;
        }
    };

    let epoch = slot.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;

    let session = match shared.sessions.get_session(hostname).await {
        Ok(session) => session,
        Err(e) => {
            mark_disconnected(shared, &slot, hostname, epoch, e.to_string());
            return;
        }
    };

    let agent = shared.agent.clone();
    let envelope_request = create_job_request("inventory.collect", json!({}), None, None);
    let result = shared
        .scheduler
        .run_blocking(
            hostname,
            QueueKind::Io,
            TaskCategory::Inventory,
            format!("inventory collect {hostname}"),
            None,
            CancellationToken::new(),
            move || agent.invoke(session.as_ref(), &envelope_request, &NullSink, None),
        )
        .await;

    match result {
        Ok(envelope) if envelope.status == ResultStatus::Success => match parse_host_snapshot(hostname, &envelope.data) {
            Ok(snapshot) => apply_snapshot(shared, &slot, hostname, epoch, snapshot),
            Err(e) => mark_disconnected(shared, &slot, hostname, epoch, e.to_string()),
        },
        Ok(envelope) => mark_disconnected(shared, &slot, hostname, epoch, envelope.message),
        Err(e) => mark_disconnected(shared, &slot, hostname, epoch, e.to_string()),
    }
}

fn apply_snapshot<C: Clock>(shared: &Shared<C>, slot: &HostSlot, hostname: &str, epoch: u64, snapshot: HostSnapshot) {
    let was_connected;
    {
        let mut state = slot.state.lock();
        if epoch <= state.epoch {
            trace!(%hostname, epoch, current = state.epoch, "discarding stale inventory snapshot");
            return;
        }
        state.epoch = epoch;
        was_connected = state.host.is_connected();
        state.host.mark_connected(shared.clock.now_utc());
        state.host.cluster = snapshot.cluster;
        state.host.resources = Some(snapshot.resources);
        state.vms = snapshot.vms.into_iter().map(|v| (v.name.clone(), v)).collect();
        state.host.vm_count = state.vms.len();
    }
    if !was_connected {
        shared.notify.host_reconnected(hostname);
    }
}

fn mark_disconnected<C: Clock>(shared: &Shared<C>, slot: &HostSlot, hostname: &str, epoch: u64, error: String) {
    let was_connected;
    {
        let mut state = slot.state.lock();
        if epoch <= state.epoch {
            return;
        }
        state.epoch = epoch;
        was_connected = state.host.is_connected();
        state.host.mark_disconnected(error.clone());
    }
    if was_connected {
        shared.notify.host_unreachable(hostname, error);
    }
}

fn recompute_cluster<C: Clock>(shared: &Shared<C>) {
    let hosts: Vec<Host> = shared.hosts.lock().values().map(|slot| slot.state.lock().host.clone()).collect();
    *shared.cluster.lock() = Cluster::from_connected_hosts(CLUSTER_NAME, &hosts);
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
