// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobRequest` / `JobResultEnvelope` serialization. No schema validation
//! is performed on `resource_spec` here — that is the caller's job, at
//! ingestion, per the operation-specific request models upstream.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Request envelope sent to the agent over the management transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRequest {
    pub operation: String,
    pub resource_spec: serde_json::Value,
    pub correlation_id: Uuid,
    pub metadata: serde_json::Value,
}

/// `status` field of a [`JobResultEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
    Partial,
}

hvfleet_core::simple_display! {
    ResultStatus {
        Success => "success",
        Error => "error",
        Partial => "partial",
    }
}

/// Result envelope parsed back from the agent's final stdout JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResultEnvelope {
    pub status: ResultStatus,
    pub message: String,
    pub data: serde_json::Value,
    pub code: Option<String>,
    pub logs: Vec<String>,
    pub correlation_id: Uuid,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("agent result payload was empty")]
    Empty,
    #[error("agent result payload was not a JSON object")]
    NotAnObject,
    #[error("agent result payload is missing required field `status`")]
    MissingStatus,
    #[error("agent result payload has unknown status `{0}`")]
    UnknownStatus(String),
    #[error("agent result payload has a malformed `correlation_id`: {0}")]
    BadCorrelationId(#[from] uuid::Error),
    #[error("failed to parse agent result payload as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build a [`JobRequest`]. Generates a fresh correlation ID when `None` is
/// passed, and injects an RFC 3339 UTC `timestamp` into `metadata` when
/// the caller's metadata doesn't already carry one.
pub fn create_job_request(
    operation: impl Into<String>,
    resource_spec: serde_json::Value,
    correlation_id: Option<Uuid>,
    metadata: Option<serde_json::Value>,
) -> JobRequest {
    let correlation_id = correlation_id.unwrap_or_else(Uuid::new_v4);
    let mut metadata = match metadata {
        Some(serde_json::Value::Object(map)) => serde_json::Value::Object(map),
        Some(_) | None => serde_json::Value::Object(serde_json::Map::new()),
    };
    if let serde_json::Value::Object(map) = &mut metadata {
        map.entry("timestamp")
            .or_insert_with(|| serde_json::Value::String(chrono::Utc::now().to_rfc3339()));
    }
    JobRequest {
        operation: operation.into(),
        resource_spec,
        correlation_id,
        metadata,
    }
}

/// Convenience wrapper for `vm.create`. Carries no behavior beyond
/// selecting the operation tag.
pub fn create_job_request_from_vm_spec(spec: serde_json::Value, correlation_id: Option<Uuid>) -> JobRequest {
    create_job_request("vm.create", spec, correlation_id, None)
}

/// Convenience wrapper for `disk.create`.
pub fn create_job_request_from_disk_spec(spec: serde_json::Value, correlation_id: Option<Uuid>) -> JobRequest {
    create_job_request("disk.create", spec, correlation_id, None)
}

/// Convenience wrapper for `nic.create`.
pub fn create_job_request_from_nic_spec(spec: serde_json::Value, correlation_id: Option<Uuid>) -> JobRequest {
    create_job_request("nic.create", spec, correlation_id, None)
}

/// Parse the agent's final stdout JSON object into a [`JobResultEnvelope`].
///
/// Fails descriptively on empty input, non-object input, a missing
/// `status`, or an unrecognized `status` value. `logs`/`data` default to
/// empty when absent; any other unrecognized field is ignored.
pub fn parse_job_result(raw: &str) -> Result<JobResultEnvelope, EnvelopeError> {
    if raw.trim().is_empty() {
        return Err(EnvelopeError::Empty);
    }
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let obj = value.as_object().ok_or(EnvelopeError::NotAnObject)?;

    let status_str = obj
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or(EnvelopeError::MissingStatus)?;
    let status = match status_str {
        "success" => ResultStatus::Success,
        "error" => ResultStatus::Error,
        "partial" => ResultStatus::Partial,
        other => return Err(EnvelopeError::UnknownStatus(other.to_string())),
    };

    let message = obj.get("message").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let data = obj.get("data").cloned().unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
    let code = obj.get("code").and_then(|v| v.as_str()).map(str::to_string);
    let logs = obj
        .get("logs")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
        .unwrap_or_default();
    let correlation_id = match obj.get("correlation_id").and_then(|v| v.as_str()) {
        Some(s) => Uuid::parse_str(s)?,
        None => Uuid::nil(),
    };

    Ok(JobResultEnvelope {
        status,
        message,
        data,
        code,
        logs,
        correlation_id,
    })
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
