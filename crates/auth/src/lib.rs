// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hvfleet-auth: OIDC/JWT validation, JWKS caching, role-to-permission
//! mapping, and session-cookie identity for the fleet control plane.
//!
//! This crate is transport-agnostic by design — it has no axum
//! dependency and knows nothing about cookies, headers, or HTTP
//! responses. The daemon binary's extractor layer is the only caller
//! that should translate an inbound request into the token/session
//! values [`service::AuthCore`] accepts.

pub mod error;
pub mod identity;
pub mod jwks;
pub mod roles;
pub mod service;
pub mod session;
pub mod token;

pub use error::AuthError;
pub use identity::{AuthenticatedUser, IdentityType, Permission};
pub use jwks::{JwksCache, JwksFetcher, ReqwestJwksFetcher};
pub use roles::{default_role_extractor, Composite, DefaultRoleExtractor, Merge, PrefixStrip, RoleExtractor};
pub use service::AuthCore;
pub use session::SessionIdentity;
pub use token::JwtValidator;
