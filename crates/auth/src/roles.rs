// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalizes role claims from whatever vendor-specific shape an issuer
//! uses into a single lowercase `HashSet<String>`.
//!
//! Extraction is composable: wrap extractors in [`Composite`] to take the
//! first non-empty source, or [`Merge`] to union every source.

use std::collections::HashSet;

use serde_json::Value;

/// Reads a normalized role set out of a decoded claims object.
pub trait RoleExtractor: Send + Sync {
    fn extract(&self, claims: &Value) -> HashSet<String>;
}

/// Strips `prefix` off each extracted role before returning it — for
/// issuers that encode roles as full URLs, e.g.
/// `https://myapp.example.com/roles/admin` -> `admin`.
pub struct PrefixStrip<E> {
    inner: E,
    prefix: String,
}

impl<E: RoleExtractor> PrefixStrip<E> {
    pub fn new(inner: E, prefix: impl Into<String>) -> Self {
        Self { inner, prefix: prefix.into() }
    }
}

impl<E: RoleExtractor> RoleExtractor for PrefixStrip<E> {
    fn extract(&self, claims: &Value) -> HashSet<String> {
        self.inner
            .extract(claims)
            .into_iter()
            .map(|role| role.strip_prefix(&self.prefix).map(str::to_string).unwrap_or(role))
            .collect()
    }
}

fn extract_string_array(value: &Value, path: &str) -> HashSet<String> {
    let target = path.split('.').fold(Some(value), |acc, segment| acc.and_then(|v| v.get(segment)));
    match target {
        Some(Value::Array(items)) => {
            items.iter().filter_map(|item| item.as_str()).map(|s| s.to_lowercase()).collect()
        }
        Some(Value::String(s)) => s.split_whitespace().map(|r| r.to_lowercase()).collect(),
        _ => HashSet::new(),
    }
}

/// Reads the `roles` claim, the shape most OIDC providers emit directly.
pub struct StandardRoleExtractor;

impl RoleExtractor for StandardRoleExtractor {
    fn extract(&self, claims: &Value) -> HashSet<String> {
        extract_string_array(claims, "roles")
    }
}

/// Reads the `groups` claim — common for providers that model
/// authorization as directory-group membership rather than roles.
pub struct GroupsRoleExtractor;

impl RoleExtractor for GroupsRoleExtractor {
    fn extract(&self, claims: &Value) -> HashSet<String> {
        extract_string_array(claims, "groups")
    }
}

/// Reads OAuth2 `scp` (array form) or `scope` (space-delimited string
/// form) claims, as emitted by scope-based authorization servers.
pub struct ScopeRoleExtractor;

impl RoleExtractor for ScopeRoleExtractor {
    fn extract(&self, claims: &Value) -> HashSet<String> {
        let mut roles = extract_string_array(claims, "scp");
        roles.extend(extract_string_array(claims, "scope"));
        roles
    }
}

/// Tries each extractor in order, returning the first non-empty result.
pub struct Composite<A, B> {
    first: A,
    second: B,
}

impl<A: RoleExtractor, B: RoleExtractor> Composite<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: RoleExtractor, B: RoleExtractor> RoleExtractor for Composite<A, B> {
    fn extract(&self, claims: &Value) -> HashSet<String> {
        let roles = self.first.extract(claims);
        if !roles.is_empty() {
            return roles;
        }
        self.second.extract(claims)
    }
}

/// Unions and dedups every source's result.
pub struct Merge<A, B> {
    first: A,
    second: B,
}

impl<A: RoleExtractor, B: RoleExtractor> Merge<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: RoleExtractor, B: RoleExtractor> RoleExtractor for Merge<A, B> {
    fn extract(&self, claims: &Value) -> HashSet<String> {
        let mut roles = self.first.extract(claims);
        roles.extend(self.second.extract(claims));
        roles
    }
}

/// The extractor wired up by default: merges `roles`, `groups`, and
/// `scp`/`scope` so any one vendor shape is picked up.
pub type DefaultRoleExtractor = Merge<Merge<StandardRoleExtractor, GroupsRoleExtractor>, ScopeRoleExtractor>;

pub fn default_role_extractor() -> DefaultRoleExtractor {
    Merge::new(Merge::new(StandardRoleExtractor, GroupsRoleExtractor), ScopeRoleExtractor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_extractor_reads_roles_array() {
        let claims = serde_json::json!({ "roles": ["Admin", "Writer"] });
        let roles = StandardRoleExtractor.extract(&claims);
        assert_eq!(roles, HashSet::from(["admin".to_string(), "writer".to_string()]));
    }

    #[test]
    fn scope_extractor_reads_space_delimited_scope_string() {
        let claims = serde_json::json!({ "scope": "Reader Writer" });
        let roles = ScopeRoleExtractor.extract(&claims);
        assert_eq!(roles, HashSet::from(["reader".to_string(), "writer".to_string()]));
    }

    #[test]
    fn composite_falls_back_to_second_when_first_is_empty() {
        let claims = serde_json::json!({ "groups": ["reader"] });
        let extractor = Composite::new(StandardRoleExtractor, GroupsRoleExtractor);
        assert_eq!(extractor.extract(&claims), HashSet::from(["reader".to_string()]));
    }

    #[test]
    fn merge_unions_every_source() {
        let claims = serde_json::json!({ "roles": ["admin"], "groups": ["writer"] });
        let extractor = Merge::new(StandardRoleExtractor, GroupsRoleExtractor);
        assert_eq!(extractor.extract(&claims), HashSet::from(["admin".to_string(), "writer".to_string()]));
    }

    #[test]
    fn prefix_strip_removes_url_prefix() {
        let claims = serde_json::json!({ "roles": ["https://myapp.example.com/roles/admin"] });
        let extractor = PrefixStrip::new(StandardRoleExtractor, "https://myapp.example.com/roles/");
        assert_eq!(extractor.extract(&claims), HashSet::from(["admin".to_string()]));
    }

    #[test]
    fn missing_claim_yields_empty_set() {
        let claims = serde_json::json!({});
        assert!(StandardRoleExtractor.extract(&claims).is_empty());
    }
}
