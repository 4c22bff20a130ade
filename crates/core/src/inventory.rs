// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inventory data model: hosts, the virtual machines running on them, and
//! the single aggregate cluster built from connected hosts.

use serde::{Deserialize, Serialize};

/// Connectivity state of a Hyper-V host, as last observed by the refresh
/// loop. A host starts `Unknown` and only ever reaches `Connected` or
/// `Disconnected` after its first probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostConnectionState {
    Unknown,
    Connected,
    Disconnected,
}

crate::simple_display! {
    HostConnectionState {
        Unknown => "unknown",
        Connected => "connected",
        Disconnected => "disconnected",
    }
}

/// Host-local storage classes and virtual switches, as reported by a
/// successful inventory collection. `None` until the first snapshot
/// lands for a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostResources {
    pub storage_classes: Vec<String>,
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub hostname: String,
    pub cluster: Option<String>,
    pub state: HostConnectionState,
    pub last_seen: Option<chrono::DateTime<chrono::Utc>>,
    pub last_error: Option<String>,
    pub vm_count: usize,
    pub resources: Option<HostResources>,
}

impl Host {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            cluster: None,
            state: HostConnectionState::Unknown,
            last_seen: None,
            last_error: None,
            vm_count: 0,
            resources: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == HostConnectionState::Connected
    }

    pub fn mark_connected(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.state = HostConnectionState::Connected;
        self.last_seen = Some(now);
        self.last_error = None;
    }

    pub fn mark_disconnected(&mut self, error: impl Into<String>) {
        self.state = HostConnectionState::Disconnected;
        self.last_error = Some(error.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmPowerState {
    Running,
    Off,
    Paused,
    Saved,
    Starting,
    Stopping,
    Creating,
    Deleting,
    Unknown,
}

crate::simple_display! {
    VmPowerState {
        Running => "running",
        Off => "off",
        Paused => "paused",
        Saved => "saved",
        Starting => "starting",
        Stopping => "stopping",
        Creating => "creating",
        Deleting => "deleting",
        Unknown => "unknown",
    }
}

/// Best-effort guest OS family, as reported by the agent. Never used for
/// scheduling decisions, only display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmOsFamily {
    Linux,
    Windows,
    Unknown,
}

crate::simple_display! {
    VmOsFamily {
        Linux => "linux",
        Windows => "windows",
        Unknown => "unknown",
    }
}

/// Key `(host, name)` uniquely identifies a VM within the fleet. The
/// `host` field is a weak reference by name, not an owning pointer — a
/// VM can outlive its host's connectivity (see module docs on retention).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vm {
    pub name: String,
    pub host: String,
    pub vm_id: Option<String>,
    pub state: VmPowerState,
    pub cpu_cores: u32,
    pub memory_gb: f64,
    pub generation: u8,
    pub os_family: VmOsFamily,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Vm {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            vm_id: None,
            state: VmPowerState::Unknown,
            cpu_cores: 0,
            memory_gb: 0.0,
            generation: 2,
            os_family: VmOsFamily::Unknown,
            created_at: None,
        }
    }
}

/// The single aggregate view built from all currently-connected hosts.
/// The inventory service names this cluster "Default"; there is exactly
/// one per the current scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub hosts: Vec<String>,
    pub total_vms: usize,
}

impl Cluster {
    pub fn from_connected_hosts(name: impl Into<String>, hosts: &[Host]) -> Self {
        let connected: Vec<&Host> = hosts.iter().filter(|h| h.is_connected()).collect();
        Self {
            name: name.into(),
            hosts: connected.iter().map(|h| h.hostname.clone()).collect(),
            total_vms: connected.iter().map(|h| h.vm_count).sum(),
        }
    }
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;
