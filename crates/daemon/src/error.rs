// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps every service-level error enum onto an HTTP response. This is the
//! one place in the daemon that translates a typed `Result` into a status
//! code and JSON body — handlers themselves never construct a response by
//! hand.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use hvfleet_auth::AuthError;
use hvfleet_inventory::InventoryError;
use hvfleet_jobs::{JobError, ValidationError};
use hvfleet_notify::NotifyError;

/// The single error type every handler's `Result` resolves to. Carries
/// its own status code so `IntoResponse` needs no further matching.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), code: None }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message, "code": self.code });
        (self.status, Json(body)).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => ApiError::not_found(format!("job {id} not found")),
            JobError::Validation(validation) => ApiError::from(validation),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string()).with_code("validation_error")
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::UnknownHost(_) => ApiError::not_found(err.to_string()),
            InventoryError::MalformedSnapshot { .. } => {
                ApiError::new(StatusCode::BAD_GATEWAY, err.to_string()).with_code("malformed_snapshot")
            }
        }
    }
}

impl From<NotifyError> for ApiError {
    fn from(err: NotifyError) -> Self {
        let NotifyError::NotFound(_) = err;
        ApiError::not_found(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match err {
            AuthError::InsufficientPermission { .. } => StatusCode::FORBIDDEN,
            AuthError::JwksUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        };
        ApiError::new(status, err.to_string())
    }
}
