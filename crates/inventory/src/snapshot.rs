// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parses the `data` payload of an `inventory.collect` envelope into the
//! [`Host`]/[`Vm`] shapes the rest of the crate works with.

use hvfleet_core::{HostResources, Vm, VmOsFamily, VmPowerState};
use serde::Deserialize;
use serde_json::Value;

use crate::error::InventoryError;

#[derive(Debug, Deserialize)]
struct VmSnapshotPayload {
    name: String,
    #[serde(default)]
    vm_id: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    cpu_cores: u32,
    #[serde(default)]
    memory_gb: f64,
    #[serde(default = "default_generation")]
    generation: u8,
    #[serde(default)]
    os_family: String,
    #[serde(default)]
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_generation() -> u8 {
    2
}

#[derive(Debug, Deserialize)]
struct HostSnapshotPayload {
    #[serde(default)]
    cluster: Option<String>,
    #[serde(default)]
    storage_classes: Vec<String>,
    #[serde(default)]
    networks: Vec<String>,
    #[serde(default)]
    vms: Vec<VmSnapshotPayload>,
}

/// One host's collected state, ready to apply to the host table.
pub struct HostSnapshot {
    pub cluster: Option<String>,
    pub resources: HostResources,
    pub vms: Vec<Vm>,
}

fn parse_power_state(s: &str) -> VmPowerState {
    match s {
        "running" => VmPowerState::Running,
        "off" => VmPowerState::Off,
        "paused" => VmPowerState::Paused,
        "saved" => VmPowerState::Saved,
        "starting" => VmPowerState::Starting,
        "stopping" => VmPowerState::Stopping,
        "creating" => VmPowerState::Creating,
        "deleting" => VmPowerState::Deleting,
        _ => VmPowerState::Unknown,
    }
}

fn parse_os_family(s: &str) -> VmOsFamily {
    match s {
        "linux" => VmOsFamily::Linux,
        "windows" => VmOsFamily::Windows,
        _ => VmOsFamily::Unknown,
    }
}

/// Parses the `data` object of a successful `inventory.collect` envelope.
pub fn parse_host_snapshot(hostname: &str, data: &Value) -> Result<HostSnapshot, InventoryError> {
    let payload: HostSnapshotPayload =
        serde_json::from_value(data.clone()).map_err(|e| InventoryError::MalformedSnapshot {
            hostname: hostname.to_string(),
            message: e.to_string(),
        })?;

    let vms = payload
        .vms
        .into_iter()
        .map(|v| Vm {
            name: v.name,
            host: hostname.to_string(),
            vm_id: v.vm_id,
            state: parse_power_state(&v.state),
            cpu_cores: v.cpu_cores,
            memory_gb: v.memory_gb,
            generation: v.generation,
            os_family: parse_os_family(&v.os_family),
            created_at: v.created_at,
        })
        .collect();

    Ok(HostSnapshot {
        cluster: payload.cluster,
        resources: HostResources { storage_classes: payload.storage_classes, networks: payload.networks },
        vms,
    })
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
