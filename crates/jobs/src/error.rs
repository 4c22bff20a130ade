// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use hvfleet_core::JobId;
use thiserror::Error;

/// Errors raised while validating an inbound request, before any [`hvfleet_core::Job`]
/// record is created. A `ValidationError` never
/// produces a job record — the caller (the HTTP layer) maps this straight
/// to a 4xx response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field group `{group}` requires all of {fields:?} or none of them")]
    IncompleteFieldGroup { group: &'static str, fields: &'static [&'static str] },
    #[error("field `{0}` must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} was not found")]
    NotFound(JobId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
