// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure planning helpers for `managed_deployment_v2` orchestration.
//!
//! [`plan_steps`] turns a [`ManagedDeploymentRequest`] into an ordered list
//! of envelope round-trips; [`crate::service::JobService`] is the only
//! component that actually dispatches them, injecting the VM ID extracted
//! from step one's result into every step after it that needs one.

use hvfleet_core::JobType;
use serde_json::{json, Value};

use crate::request::ManagedDeploymentRequest;

/// One step of a managed deployment, in dispatch order.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub label: &'static str,
    pub job_type: JobType,
    pub operation: &'static str,
    pub resource_spec: Value,
    /// Whether this step's `resource_spec` must be extended with the parent
    /// VM's ID before dispatch.
    pub needs_vm_id: bool,
}

/// Builds the step sequence for one request: `vm.create` always first,
/// then `disk.create`/`nic.create`/`initialize` conditionally, in that
/// fixed order.
pub fn plan_steps(request: &ManagedDeploymentRequest) -> Vec<PlannedStep> {
    let mut steps = vec![PlannedStep {
        label: "vm.create",
        job_type: JobType::ProvisionVm,
        operation: "vm.create",
        resource_spec: request.vm_spec.clone(),
        needs_vm_id: false,
    }];

    if let Some(disk_spec) = &request.disk_spec {
        steps.push(PlannedStep {
            label: "disk.create",
            job_type: JobType::CreateDisk,
            operation: "disk.create",
            resource_spec: disk_spec.clone(),
            needs_vm_id: true,
        });
    }

    if let Some(nic_spec) = &request.nic_spec {
        steps.push(PlannedStep {
            label: "nic.create",
            job_type: JobType::CreateNic,
            operation: "nic.create",
            resource_spec: nic_spec.clone(),
            needs_vm_id: true,
        });
    }

    if let Some(guest_config) = &request.guest_config {
        steps.push(PlannedStep {
            label: "initialize",
            job_type: JobType::InitializeVm,
            operation: "initialize",
            resource_spec: guest_config.compose(),
            needs_vm_id: false,
        });
    }

    steps
}

/// Returns `spec` with `vm_id` set, without mutating the input. `spec` is
/// coerced to an object if it somehow isn't one (defensive only — every
/// caller in this crate passes an object).
pub fn inject_vm_id(spec: &Value, vm_id: &str) -> Value {
    let mut map = spec.as_object().cloned().unwrap_or_default();
    map.insert("vm_id".to_string(), json!(vm_id));
    Value::Object(map)
}

/// Pulls `data.vm_id` out of a `vm.create` step's successful result.
pub fn extract_vm_id(data: &Value) -> Option<String> {
    data.get("vm_id").and_then(|v| v.as_str()).map(str::to_string)
}
