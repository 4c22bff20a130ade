// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn base() -> (String, String) {
    ("la-admin".to_string(), "hunter2".to_string())
}

#[test]
fn minimal_request_composes_only_la_fields() {
    let (uid, pw) = base();
    let req = GuestConfigRequest::new(uid, pw, None, None, None, None, None, None, None, None, None, None, None, None).unwrap();
    let composed = req.compose();
    assert_eq!(composed["guest_la_uid"], "la-admin");
    assert_eq!(composed["guest_la_pw"], "hunter2");
    assert!(composed.get("guest_domain_join_target").is_none());
    assert!(composed.get("guest_ansible_ssh_user").is_none());
    assert!(composed.get("guest_ip_addr").is_none());
}

#[test]
fn domain_join_group_all_present_composes() {
    let (uid, pw) = base();
    let req = GuestConfigRequest::new(
        uid,
        pw,
        Some("CORP".to_string()),
        Some("joiner".to_string()),
        Some("secret".to_string()),
        Some("OU=Servers".to_string()),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    )
    .unwrap();
    let composed = req.compose();
    assert_eq!(composed["guest_domain_join_target"], "CORP");
    assert_eq!(composed["guest_domain_join_uid"], "joiner");
    assert_eq!(composed["guest_domain_join_pw"], "secret");
    assert_eq!(composed["guest_domain_join_ou"], "OU=Servers");
    assert!(composed.get("guest_ansible_ssh_user").is_none());
    assert!(composed.get("guest_ip_addr").is_none());
}

#[test]
fn domain_join_group_partial_is_rejected() {
    let (uid, pw) = base();
    let err = GuestConfigRequest::new(
        uid,
        pw,
        Some("CORP".to_string()),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::IncompleteFieldGroup { group: "domain-join", .. }));
}

#[test]
fn ansible_group_partial_is_rejected() {
    let (uid, pw) = base();
    let err = GuestConfigRequest::new(
        uid,
        pw,
        None,
        None,
        None,
        None,
        Some("deploy".to_string()),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::IncompleteFieldGroup { group: "ansible-ssh", .. }));
}

#[test]
fn static_ip_required_group_partial_is_rejected() {
    let (uid, pw) = base();
    let err = GuestConfigRequest::new(
        uid,
        pw,
        None,
        None,
        None,
        None,
        None,
        None,
        Some("10.0.0.5".to_string()),
        Some("24".to_string()),
        None,
        None,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::IncompleteFieldGroup { group: "static-ip-required", .. }));
}

#[test]
fn static_ip_optional_fields_included_independently() {
    let (uid, pw) = base();
    let req = GuestConfigRequest::new(
        uid,
        pw,
        None,
        None,
        None,
        None,
        None,
        None,
        Some("10.0.0.5".to_string()),
        Some("24".to_string()),
        Some("10.0.0.1".to_string()),
        Some("10.0.0.2".to_string()),
        Some("10.0.0.3".to_string()),
        Some("corp.local".to_string()),
    )
    .unwrap();
    let composed = req.compose();
    assert_eq!(composed["guest_dns2"], "10.0.0.3");
    assert_eq!(composed["guest_dns_suffix"], "corp.local");
}

/// Domain-join fields present, ansible and static-IP
/// absent — the composed payload must carry exactly the LA + domain keys.
#[test]
fn scenario_domain_join_excludes_unrelated_groups() {
    let req = GuestConfigRequest::new(
        "la-admin",
        "hunter2",
        Some("CORP".to_string()),
        Some("joiner".to_string()),
        Some("secret".to_string()),
        Some("OU=Servers".to_string()),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    )
    .unwrap();
    let composed = req.compose();
    let obj = composed.as_object().unwrap();
    let keys: std::collections::HashSet<_> = obj.keys().cloned().collect();
    let expected: std::collections::HashSet<_> = [
        "guest_la_uid",
        "guest_la_pw",
        "guest_domain_join_target",
        "guest_domain_join_uid",
        "guest_domain_join_pw",
        "guest_domain_join_ou",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();
    assert_eq!(keys, expected);
}

#[test]
fn compose_is_pure_and_deterministic() {
    let req = GuestConfigRequest::new("a", "b", None, None, None, None, None, None, None, None, None, None, None, None).unwrap();
    assert_eq!(req.compose(), req.compose());
}
