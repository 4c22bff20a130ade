// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job submission and inspection: `vms/create`, `vms/delete`,
//! `deployments`, and the read-only `jobs` list/get pair.
//!
//! Request bodies are plain `#[derive(Deserialize)]` structs; each is
//! converted into the matching `hvfleet_jobs` request type through its
//! validating constructor, so a malformed "all-or-none" guest-config group
//! is rejected here, before a job record ever exists.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use hvfleet_auth::Permission;
use hvfleet_core::JobId;
use hvfleet_jobs::{GuestConfigRequest, ManagedDeploymentRequest, SimpleJobRequest};
use serde::Deserialize;
use serde_json::Value;

use crate::auth_extract::Identity;
use crate::context::AppContext;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateVmBody {
    pub target_host: String,
    #[serde(default = "Value::default")]
    pub vm_spec: Value,
}

#[derive(Debug, Deserialize)]
pub struct DeleteVmBody {
    pub target_host: String,
    #[serde(default = "Value::default")]
    pub vm_spec: Value,
}

pub async fn create_vm(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Json(body): Json<CreateVmBody>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Writer)?;
    let request = SimpleJobRequest::new(hvfleet_core::JobType::ProvisionVm, body.target_host, body.vm_spec)?;
    Ok(Json(context.jobs.submit_simple(request)))
}

pub async fn delete_vm(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Json(body): Json<DeleteVmBody>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Writer)?;
    let request = SimpleJobRequest::new(hvfleet_core::JobType::DeleteVm, body.target_host, body.vm_spec)?;
    Ok(Json(context.jobs.submit_simple(request)))
}

/// Mirrors [`GuestConfigRequest::new`]'s parameter groups one-for-one; the
/// constructor (not this struct) is where the all-or-none enforcement
/// lives.
#[derive(Debug, Deserialize)]
pub struct GuestConfigBody {
    pub guest_la_uid: String,
    pub guest_la_pw: String,
    #[serde(default)]
    pub domain_target: Option<String>,
    #[serde(default)]
    pub domain_uid: Option<String>,
    #[serde(default)]
    pub domain_pw: Option<String>,
    #[serde(default)]
    pub domain_ou: Option<String>,
    #[serde(default)]
    pub ansible_ssh_user: Option<String>,
    #[serde(default)]
    pub ansible_ssh_key: Option<String>,
    #[serde(default)]
    pub ip_addr: Option<String>,
    #[serde(default)]
    pub cidr_prefix: Option<String>,
    #[serde(default)]
    pub default_gw: Option<String>,
    #[serde(default)]
    pub dns1: Option<String>,
    #[serde(default)]
    pub dns2: Option<String>,
    #[serde(default)]
    pub dns_suffix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentBody {
    pub target_host: String,
    pub vm_spec: Value,
    #[serde(default)]
    pub disk_spec: Option<Value>,
    #[serde(default)]
    pub nic_spec: Option<Value>,
    #[serde(default)]
    pub guest_config: Option<GuestConfigBody>,
}

pub async fn create_deployment(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Json(body): Json<DeploymentBody>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Writer)?;

    let guest_config = body
        .guest_config
        .map(|g| {
            GuestConfigRequest::new(
                g.guest_la_uid,
                g.guest_la_pw,
                g.domain_target,
                g.domain_uid,
                g.domain_pw,
                g.domain_ou,
                g.ansible_ssh_user,
                g.ansible_ssh_key,
                g.ip_addr,
                g.cidr_prefix,
                g.default_gw,
                g.dns1,
                g.dns2,
                g.dns_suffix,
            )
        })
        .transpose()?;

    let request = ManagedDeploymentRequest::new(body.target_host, body.vm_spec, body.disk_spec, body.nic_spec, guest_config)?;
    Ok(Json(context.jobs.submit_managed_deployment(request)))
}

pub async fn list_jobs(State(context): State<Arc<AppContext>>, Identity(user): Identity) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(context.jobs.list()))
}

pub async fn get_job(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Path(job_id): Path<JobId>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(context.jobs.get(job_id)?))
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
