// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guest OS initialization parameters and the pure map-building function
//! that turns them into the agent's `initialize` payload.
//!
//! [`GuestConfigRequest::new`] is the validating constructor: it enforces
//! the three all-or-none parameter groups (domain-join, ansible-ssh,
//! static-IP-required) at ingestion, so [`compose`] itself never has to
//! reject anything — by the time a `GuestConfigRequest` exists, its groups
//! are already internally consistent.

use serde_json::{json, Map, Value};

use crate::error::ValidationError;

/// Flat guest-initialization parameters for a managed deployment's
/// `initialize` step. Every optional field participates in one of the
/// all-or-none groups documented on [`GuestConfigRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestConfigRequest {
    pub guest_la_uid: String,
    pub guest_la_pw: String,

    pub domain_target: Option<String>,
    pub domain_uid: Option<String>,
    pub domain_pw: Option<String>,
    pub domain_ou: Option<String>,

    pub ansible_ssh_user: Option<String>,
    pub ansible_ssh_key: Option<String>,

    pub ip_addr: Option<String>,
    pub cidr_prefix: Option<String>,
    pub default_gw: Option<String>,
    pub dns1: Option<String>,

    pub dns2: Option<String>,
    pub dns_suffix: Option<String>,
}

fn non_empty(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|v| !v.is_empty())
}

impl GuestConfigRequest {
    /// Builds a [`GuestConfigRequest`], rejecting any of the three
    /// all-or-none groups supplied only partially:
    /// - domain-join: `target`, `uid`, `pw`, `ou`
    /// - ansible: `ssh_user`, `ssh_key`
    /// - static-IP required: `ip_addr`, `cidr_prefix`, `default_gw`, `dns1`
    ///
    /// `dns2`/`dns_suffix` are independent optionals, not part of any group.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        guest_la_uid: impl Into<String>,
        guest_la_pw: impl Into<String>,
        domain_target: Option<String>,
        domain_uid: Option<String>,
        domain_pw: Option<String>,
        domain_ou: Option<String>,
        ansible_ssh_user: Option<String>,
        ansible_ssh_key: Option<String>,
        ip_addr: Option<String>,
        cidr_prefix: Option<String>,
        default_gw: Option<String>,
        dns1: Option<String>,
        dns2: Option<String>,
        dns_suffix: Option<String>,
    ) -> Result<Self, ValidationError> {
        let domain_fields = [&domain_target, &domain_uid, &domain_pw, &domain_ou];
        let domain_present = domain_fields.iter().filter(|f| non_empty(f)).count();
        if domain_present != 0 && domain_present != domain_fields.len() {
            return Err(ValidationError::IncompleteFieldGroup {
                group: "domain-join",
                fields: &["target", "uid", "pw", "ou"],
            });
        }

        let ansible_fields = [&ansible_ssh_user, &ansible_ssh_key];
        let ansible_present = ansible_fields.iter().filter(|f| non_empty(f)).count();
        if ansible_present != 0 && ansible_present != ansible_fields.len() {
            return Err(ValidationError::IncompleteFieldGroup {
                group: "ansible-ssh",
                fields: &["ssh_user", "ssh_key"],
            });
        }

        let static_ip_fields = [&ip_addr, &cidr_prefix, &default_gw, &dns1];
        let static_ip_present = static_ip_fields.iter().filter(|f| non_empty(f)).count();
        if static_ip_present != 0 && static_ip_present != static_ip_fields.len() {
            return Err(ValidationError::IncompleteFieldGroup {
                group: "static-ip-required",
                fields: &["ip_addr", "cidr_prefix", "default_gw", "dns1"],
            });
        }

        Ok(Self {
            guest_la_uid: guest_la_uid.into(),
            guest_la_pw: guest_la_pw.into(),
            domain_target,
            domain_uid,
            domain_pw,
            domain_ou,
            ansible_ssh_user,
            ansible_ssh_key,
            ip_addr,
            cidr_prefix,
            default_gw,
            dns1,
            dns2,
            dns_suffix,
        })
    }

    /// Builds the agent-facing `initialize` payload. Pure: the
    /// same request always composes to the same map, and `self` is
    /// untouched.
    pub fn compose(&self) -> Value {
        let mut map = Map::new();
        map.insert("guest_la_uid".to_string(), json!(self.guest_la_uid));
        map.insert("guest_la_pw".to_string(), json!(self.guest_la_pw));

        if non_empty(&self.domain_target) {
            map.insert("guest_domain_join_target".to_string(), json!(self.domain_target));
            map.insert("guest_domain_join_uid".to_string(), json!(self.domain_uid));
            map.insert("guest_domain_join_pw".to_string(), json!(self.domain_pw));
            map.insert("guest_domain_join_ou".to_string(), json!(self.domain_ou));
        }

        if non_empty(&self.ansible_ssh_user) {
            map.insert("guest_ansible_ssh_user".to_string(), json!(self.ansible_ssh_user));
            map.insert("guest_ansible_ssh_key".to_string(), json!(self.ansible_ssh_key));
        }

        if non_empty(&self.ip_addr) {
            map.insert("guest_ip_addr".to_string(), json!(self.ip_addr));
            map.insert("guest_cidr_prefix".to_string(), json!(self.cidr_prefix));
            map.insert("guest_default_gw".to_string(), json!(self.default_gw));
            map.insert("guest_dns1".to_string(), json!(self.dns1));
        }

        if non_empty(&self.dns2) {
            map.insert("guest_dns2".to_string(), json!(self.dns2));
        }
        if non_empty(&self.dns_suffix) {
            map.insert("guest_dns_suffix".to_string(), json!(self.dns_suffix));
        }

        Value::Object(map)
    }
}

#[cfg(test)]
#[path = "guest_config_tests.rs"]
mod tests;
