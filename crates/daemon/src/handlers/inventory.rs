// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only inventory surface: the full snapshot, host list, per-host and
//! fleet-wide VM lists, and VM lookup by id.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use hvfleet_auth::Permission;
use serde_json::json;

use crate::auth_extract::Identity;
use crate::context::AppContext;
use crate::error::ApiError;

/// The combined view a dashboard wants in one round-trip: the cluster
/// aggregate plus every host and every VM, rather than three separate
/// requests.
pub async fn get_inventory(State(context): State<Arc<AppContext>>, Identity(user): Identity) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(json!({
        "cluster": context.inventory.cluster(),
        "hosts": context.inventory.list_hosts(),
        "vms": context.inventory.list_vms(),
    })))
}

pub async fn list_hosts(State(context): State<Arc<AppContext>>, Identity(user): Identity) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(context.inventory.list_hosts()))
}

pub async fn get_host(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Path(hostname): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(context.inventory.get_host(&hostname)?))
}

pub async fn list_host_vms(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Path(hostname): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(context.inventory.list_vms_for_host(&hostname)?))
}

pub async fn list_vms(State(context): State<Arc<AppContext>>, Identity(user): Identity) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(context.inventory.list_vms()))
}

pub async fn get_vm(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    match context.inventory.get_vm(&hostname, &name) {
        Some(vm) => Ok(Json(vm)),
        None => Err(ApiError::not_found(format!("vm {name} on {hostname} not found"))),
    }
}

pub async fn get_vm_by_id(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Path(vm_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    match context.inventory.get_vm_by_id(&vm_id) {
        Some(vm) => Ok(Json(vm)),
        None => Err(ApiError::not_found(format!("vm with id {vm_id} not found"))),
    }
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;
