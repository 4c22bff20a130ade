// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::client::ClientId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WsError {
    #[error("client {0} is not connected")]
    NotConnected(ClientId),
}
