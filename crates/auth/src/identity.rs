// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The resolved identity an authenticated request carries, and the
//! permission hierarchy roles map to.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::AuthError;

/// Three ordered permissions. `Admin` implies `Writer` and `Reader`;
/// `Writer` implies `Reader`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    Reader,
    Writer,
    Admin,
}

impl Permission {
    fn name(self) -> &'static str {
        match self {
            Permission::Reader => "reader",
            Permission::Writer => "writer",
            Permission::Admin => "admin",
        }
    }
}

/// Whether the identity represents an interactive user or an automation
/// caller. `service_principal` when the claims carry `idtyp=="app"` or an
/// `appid`, matching Azure AD / Entra ID's convention for app-only tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityType {
    User,
    ServicePrincipal,
}

pub fn identity_type_from_claims(claims: &Value) -> IdentityType {
    let is_app = claims.get("idtyp").and_then(Value::as_str) == Some("app") || claims.get("appid").is_some();
    if is_app {
        IdentityType::ServicePrincipal
    } else {
        IdentityType::User
    }
}

/// Expands a raw role set into the permissions it grants: `admin` implies
/// `writer`+`reader`, `writer` implies `reader`, and `legacy_role` (when
/// configured) is treated as an alias for `writer` for callers still
/// presenting the single-role scheme that predates the hierarchy.
pub fn compute_permissions(roles: &HashSet<String>, legacy_role: Option<&str>) -> HashSet<Permission> {
    let mut permissions = HashSet::new();
    let has = |name: &str| roles.iter().any(|r| r.eq_ignore_ascii_case(name));

    if has("admin") {
        permissions.insert(Permission::Admin);
        permissions.insert(Permission::Writer);
        permissions.insert(Permission::Reader);
    }
    if has("writer") {
        permissions.insert(Permission::Writer);
        permissions.insert(Permission::Reader);
    }
    if has("reader") {
        permissions.insert(Permission::Reader);
    }
    if let Some(legacy) = legacy_role {
        if has(legacy) {
            permissions.insert(Permission::Writer);
            permissions.insert(Permission::Reader);
        }
    }
    permissions
}

/// The resolved identity attached to a request once authentication
/// succeeds, regardless of which path (bearer token, session cookie,
/// static API token, or dev mode) produced it.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub email: Option<String>,
    pub roles: HashSet<String>,
    pub permissions: HashSet<Permission>,
    pub identity_type: IdentityType,
    pub claims: Value,
}

impl AuthenticatedUser {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermission { required: permission.name() })
        }
    }

    /// Builds an identity from decoded claims and a role set already
    /// normalized by a [`crate::roles::RoleExtractor`].
    pub fn from_claims(claims: Value, roles: HashSet<String>, legacy_role: Option<&str>) -> Self {
        let subject = claims.get("sub").and_then(Value::as_str).unwrap_or_default().to_string();
        let email = claims.get("email").and_then(Value::as_str).map(str::to_string);
        let identity_type = identity_type_from_claims(&claims);
        let permissions = compute_permissions(&roles, legacy_role);
        Self { subject, email, roles, permissions, identity_type, claims }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_implies_writer_and_reader() {
        let roles = HashSet::from(["admin".to_string()]);
        let permissions = compute_permissions(&roles, None);
        assert!(permissions.contains(&Permission::Admin));
        assert!(permissions.contains(&Permission::Writer));
        assert!(permissions.contains(&Permission::Reader));
    }

    #[test]
    fn writer_role_does_not_imply_admin() {
        let roles = HashSet::from(["writer".to_string()]);
        let permissions = compute_permissions(&roles, None);
        assert!(!permissions.contains(&Permission::Admin));
        assert!(permissions.contains(&Permission::Writer));
        assert!(permissions.contains(&Permission::Reader));
    }

    #[test]
    fn legacy_role_maps_to_writer_and_reader() {
        let roles = HashSet::from(["operator".to_string()]);
        let permissions = compute_permissions(&roles, Some("operator"));
        assert!(!permissions.contains(&Permission::Admin));
        assert!(permissions.contains(&Permission::Writer));
        assert!(permissions.contains(&Permission::Reader));
    }

    #[test]
    fn unrecognized_role_grants_nothing() {
        let roles = HashSet::from(["guest".to_string()]);
        assert!(compute_permissions(&roles, None).is_empty());
    }

    #[test]
    fn identity_type_detects_service_principal_by_idtyp() {
        let claims = serde_json::json!({ "idtyp": "app" });
        assert_eq!(identity_type_from_claims(&claims), IdentityType::ServicePrincipal);
    }

    #[test]
    fn identity_type_detects_service_principal_by_appid() {
        let claims = serde_json::json!({ "appid": "00000000-0000-0000-0000-000000000000" });
        assert_eq!(identity_type_from_claims(&claims), IdentityType::ServicePrincipal);
    }

    #[test]
    fn identity_type_defaults_to_user() {
        let claims = serde_json::json!({ "sub": "alice" });
        assert_eq!(identity_type_from_claims(&claims), IdentityType::User);
    }

    #[test]
    fn require_rejects_missing_permission() {
        let user = AuthenticatedUser::from_claims(serde_json::json!({ "sub": "alice" }), HashSet::from(["reader".to_string()]), None);
        let err = user.require(Permission::Writer).unwrap_err();
        assert!(matches!(err, AuthError::InsufficientPermission { required: "writer" }));
    }
}
