// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification feed reads and the two mark-read mutations.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use hvfleet_auth::Permission;
use hvfleet_core::NotificationId;
use serde::Deserialize;
use serde_json::json;

use crate::auth_extract::Identity;
use crate::context::AppContext;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

pub async fn list_notifications(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(context.notifications.list(query.limit)))
}

pub async fn list_unread(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Reader)?;
    Ok(Json(context.notifications.list_unread(query.limit)))
}

pub async fn mark_read(
    State(context): State<Arc<AppContext>>,
    Identity(user): Identity,
    Path(notification_id): Path<NotificationId>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Writer)?;
    context.notifications.mark_read(notification_id)?;
    Ok(Json(json!({ "notification_id": notification_id, "read": true })))
}

pub async fn mark_all_read(State(context): State<Arc<AppContext>>, Identity(user): Identity) -> Result<impl IntoResponse, ApiError> {
    user.require(Permission::Writer)?;
    let changed = context.notifications.mark_all_read();
    Ok(Json(json!({ "changed": changed })))
}

#[cfg(test)]
#[path = "notifications_tests.rs"]
mod tests;
