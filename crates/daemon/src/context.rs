// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the nine service crates into one service graph. This is the only
//! place in the daemon that constructs a concrete [`Broadcaster`], session
//! factory, or remote agent — every service downstream of here only ever
//! sees the trait objects.

use std::sync::Arc;

use hvfleet_auth::AuthCore;
use hvfleet_core::{Broadcaster, Clock, Settings, SystemClock};
use hvfleet_inventory::{InventoryService, NullArtifactDeployer};
use hvfleet_jobs::JobService;
use hvfleet_notify::NotificationService;
use hvfleet_scheduler::{RemoteTaskScheduler, SchedulerConfig};
use hvfleet_transport::{RemoteAgent, SessionCache, SessionFactory};
use hvfleet_ws::WsHub;
use tokio_util::sync::CancellationToken;

use crate::process_transport::{ProcessRemoteAgent, ProcessSessionFactory};

/// The fully-wired service graph, plus the settings it was built from and
/// a shutdown token the janitor and inventory loops watch.
pub struct AppContext {
    pub settings: Settings,
    pub clock: SystemClock,
    pub jobs: Arc<JobService<SystemClock>>,
    pub inventory: Arc<InventoryService<SystemClock>>,
    pub notifications: Arc<NotificationService<SystemClock>>,
    pub ws_hub: Arc<WsHub<SystemClock>>,
    pub auth: Arc<AuthCore<SystemClock>>,
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn build(settings: Settings) -> Arc<Self> {
        let clock = SystemClock;

        let ws_hub = Arc::new(WsHub::new(clock.clone(), settings.websocket_timeout()));
        let broadcaster: Arc<dyn Broadcaster> = ws_hub.clone() as Arc<dyn Broadcaster>;

        let notifications = Arc::new(NotificationService::new(clock.clone(), broadcaster.clone()));

        let scheduler = Arc::new(RemoteTaskScheduler::new(SchedulerConfig::from_settings(&settings)));

        let (session_factory, agent): (Arc<dyn SessionFactory>, Arc<dyn RemoteAgent>) = if settings.dummy_data {
            (
                Arc::new(hvfleet_transport::FakeSessionFactory::new()),
                Arc::new(hvfleet_transport::FakeRemoteAgent::new()),
            )
        } else {
            (
                Arc::new(ProcessSessionFactory::new(settings.hyperv_hosts.clone())),
                Arc::new(ProcessRemoteAgent::new(
                    settings.winrm_username.clone(),
                    settings.winrm_password.clone(),
                    settings.winrm_port,
                    settings.host_install_directory.clone().unwrap_or_else(|| "C:/hvfleet-agent".to_string()),
                )),
            )
        };
        let sessions = Arc::new(SessionCache::new(session_factory));

        let jobs = Arc::new(JobService::new(
            clock.clone(),
            scheduler.clone(),
            sessions.clone(),
            agent.clone(),
            notifications.clone(),
            broadcaster.clone(),
            None,
        ));

        // Real artifact transfer is out of scope for this workspace
        // (see `hvfleet_inventory::deploy`'s module docs); this is not a
        // shortcut specific to the daemon binary.
        let deployer = settings
            .agent_artifacts_path
            .is_some()
            .then(|| Arc::new(NullArtifactDeployer) as Arc<dyn hvfleet_inventory::ArtifactDeployer>);

        let inventory = Arc::new(InventoryService::new(
            clock.clone(),
            scheduler,
            sessions,
            agent,
            notifications.clone(),
            broadcaster,
            deployer,
            settings.agent_startup_concurrency,
            settings.hyperv_hosts.clone(),
        ));

        let auth = Arc::new(AuthCore::from_settings(clock.clone(), &settings));

        Arc::new(Self {
            settings,
            clock,
            jobs,
            inventory,
            notifications,
            ws_hub,
            auth,
            shutdown: CancellationToken::new(),
        })
    }
}
