// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request models for the operations the job service accepts.
//!
//! ("dataclass-style request models
//! with in-model validation"), each request type's constructor is the
//! single place its invariants are enforced — the HTTP layer builds one of
//! these and propagates [`crate::error::ValidationError`] as a 4xx without
//! a job record ever being created.

use hvfleet_core::JobType;
use serde_json::Value;

use crate::error::ValidationError;
use crate::guest_config::GuestConfigRequest;

/// Maps a [`JobType`] to the wire `operation` tag the envelope codec uses.
/// `ManagedDeploymentV2` has no single operation tag — it is orchestrated
/// as a sequence of the other four tags by [`crate::deployment`].
pub fn operation_tag(job_type: JobType) -> &'static str {
    match job_type {
        JobType::ProvisionVm => "vm.create",
        JobType::DeleteVm => "vm.delete",
        JobType::CreateDisk => "disk.create",
        JobType::CreateNic => "nic.create",
        JobType::InitializeVm => "initialize",
        JobType::NoopTest => "noop-test",
        JobType::ManagedDeploymentV2 => "managed_deployment_v2",
    }
}

/// A single-step request: submit one envelope operation against one host.
/// Covers `provision_vm`, `delete_vm`, `create_disk`, `create_nic`,
/// `initialize_vm`, and `noop_test`.
#[derive(Debug, Clone)]
pub struct SimpleJobRequest {
    pub job_type: JobType,
    pub target_host: String,
    pub resource_spec: Value,
}

impl SimpleJobRequest {
    pub fn new(job_type: JobType, target_host: impl Into<String>, resource_spec: Value) -> Result<Self, ValidationError> {
        let target_host = target_host.into();
        if target_host.is_empty() {
            return Err(ValidationError::Empty("target_host"));
        }
        Ok(Self { job_type, target_host, resource_spec })
    }
}

/// A `managed_deployment_v2` request: VM creation, with optional disk/NIC
/// attachment and guest initialization, orchestrated as one top-level job
/// with ordered child jobs.
#[derive(Debug, Clone)]
pub struct ManagedDeploymentRequest {
    pub target_host: String,
    pub vm_spec: Value,
    pub disk_spec: Option<Value>,
    pub nic_spec: Option<Value>,
    pub guest_config: Option<GuestConfigRequest>,
}

impl ManagedDeploymentRequest {
    /// `disk_spec`/`nic_spec`/`guest_config` are each independently
    /// optional — only `guest_config`'s internal field groups have
    /// all-or-none cardinality (enforced by [`GuestConfigRequest::new`]
    /// before this constructor ever sees it).
    pub fn new(
        target_host: impl Into<String>,
        vm_spec: Value,
        disk_spec: Option<Value>,
        nic_spec: Option<Value>,
        guest_config: Option<GuestConfigRequest>,
    ) -> Result<Self, ValidationError> {
        let target_host = target_host.into();
        if target_host.is_empty() {
            return Err(ValidationError::Empty("target_host"));
        }
        Ok(Self { target_host, vm_spec, disk_spec, nic_spec, guest_config })
    }
}
