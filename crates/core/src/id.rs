// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UUID-backed ID newtypes.
//!
//! Every identity in the core (job, notification, websocket client) is a
//! UUID at the wire level — correlation IDs in particular are echoed
//! verbatim by the remote agent, so the representation has to be the bare
//! UUID string, not a prefixed/shortened form. [`define_uuid_id!`] generates
//! a newtype wrapper with the `Copy`/`Hash`/serde ergonomics call sites
//! expect, without hiding the underlying [`uuid::Uuid`].

/// Define a newtype ID wrapper around [`uuid::Uuid`].
///
/// Generates `new()` (random v4), `nil()`, `parse_str()`, `Display`,
/// `From<Uuid>`, `Deref<Target = Uuid>`, and transparent serde support.
///
/// ```ignore
/// define_uuid_id! {
///     /// Doc comment for the ID type.
///     pub struct JobId;
/// }
/// ```
#[macro_export]
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a fresh random ID.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// The nil (all-zero) ID, useful as a sentinel in tests.
            pub const fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }

            /// Parse an ID from its canonical string form.
            pub fn parse_str(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }

            pub fn as_uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl std::ops::Deref for $name {
            type Target = uuid::Uuid;

            fn deref(&self) -> &uuid::Uuid {
                &self.0
            }
        }
    };
}

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
