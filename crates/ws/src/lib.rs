// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The WebSocket hub: client registry, per-client topic subscriptions, and
//! the broadcast fan-out every other service reaches through
//! [`hvfleet_core::Broadcaster`].
//!
//! See [`hub::WsHub`] for the module-level locking contract — the one
//! non-negotiable ordering rule in this crate is that sends never happen
//! while the registry lock is held.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
mod error;
pub mod frames;
mod hub;

pub use client::ClientId;
pub use client::ClientSink;
pub use error::WsError;
pub use hub::WsHub;

#[cfg(any(test, feature = "test-support"))]
pub use client::fake::{RecordingSink, StallingSink};
