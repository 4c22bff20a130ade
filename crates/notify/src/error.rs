// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use hvfleet_core::NotificationId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification {0} was not found")]
    NotFound(NotificationId),
}
