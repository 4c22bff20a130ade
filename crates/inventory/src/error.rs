// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("unknown host {0}")]
    UnknownHost(String),
    #[error("collection payload for {hostname} was malformed: {message}")]
    MalformedSnapshot { hostname: String, message: String },
}
