use std::sync::Arc;
use std::thread;

use clinic_access::{
    evaluate_permission, has_permission, load_permission_table, render_permission_policy,
    AccessGate, Grant, PermissionTable, Principal, Role, Scope,
};
use clinic_core::write_text_atomic;
use serde_json::json;
use tempfile::tempdir;

const RESOURCES: [&str; 9] = [
    "patients",
    "agenda",
    "evolutions",
    "clinical_records",
    "documents",
    "financial",
    "reports",
    "supervision",
    "units",
];
const ACTIONS: [&str; 5] = ["view", "create", "edit", "approve", "request"];

fn scopes() -> [Option<Scope>; 4] {
    [None, Some(Scope::Own), Some(Scope::Unit), Some(Scope::Global)]
}

#[test]
fn integration_admin_is_allowed_everything_under_any_policy() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("permissions.json");
    write_text_atomic(&path, &json!({"schema_version": 1, "roles": {}}).to_string())
        .expect("write empty policy");
    let empty = load_permission_table(&path).expect("load empty policy");
    assert!(empty.is_empty());

    let admin = Principal::new("root", Role::Admin);
    for table in [&empty, &PermissionTable::clinic_defaults()] {
        for resource in RESOURCES {
            for action in ACTIONS {
                for scope in scopes() {
                    assert!(has_permission(table, Some(&admin), resource, action, scope));
                }
            }
        }
    }
}

#[test]
fn integration_missing_principal_is_denied_everything() {
    let table = PermissionTable::clinic_defaults();
    for resource in RESOURCES {
        for action in ACTIONS {
            for scope in scopes() {
                let decision = evaluate_permission(&table, None, resource, action, scope);
                assert!(!decision.is_allowed());
                assert_eq!(decision.reason_code(), "deny_principal_missing");
            }
        }
    }
}

#[test]
fn integration_explicit_deny_beats_every_grant_in_the_policy_file() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("permissions.json");
    write_text_atomic(
        &path,
        &json!({
            "schema_version": 1,
            "roles": {
                "reception": [
                    {"resource": "*", "action": "*", "scope": "unit"},
                    {"resource": "financial", "action": "*", "scope": "global"},
                    {"resource": "financial", "action": "deny"}
                ]
            }
        })
        .to_string(),
    )
    .expect("write policy");
    let table = load_permission_table(&path).expect("load policy");
    let reception = Principal::new("rec-1", Role::Reception);

    for action in ACTIONS {
        for scope in scopes() {
            let decision = evaluate_permission(&table, Some(&reception), "financial", action, scope);
            assert_eq!(decision.reason_code(), "deny_explicit_resource_deny");
            assert_eq!(decision.matched_grant(), Some(&Grant::deny("financial")));
        }
    }
    assert!(has_permission(&table, Some(&reception), "agenda", "create", Some(Scope::Unit)));
}

#[test]
fn integration_clinic_defaults_match_front_desk_and_clinical_expectations() {
    let table = PermissionTable::clinic_defaults();
    let therapist = Principal::new("t-1", Role::Therapist);
    let reception = Principal::new("r-1", Role::Reception);
    let guardian = Principal::new("g-1", Role::Guardian);
    let coordinator = Principal::new("c-1", Role::Coordinator);

    let therapist_gate = AccessGate::new(&table, Some(&therapist));
    assert!(therapist_gate.can("evolutions", "create", Some(Scope::Own)));
    assert!(!therapist_gate.can("evolutions", "approve", Some(Scope::Own)));
    assert!(!therapist_gate.can("patients", "view", Some(Scope::Unit)));

    let reception_gate = AccessGate::new(&table, Some(&reception));
    assert!(reception_gate.can("agenda", "create", Some(Scope::Unit)));
    assert!(!reception_gate.can("clinical_records", "view", Some(Scope::Unit)));
    assert!(!reception_gate.can("evolutions", "view", None));

    let guardian_gate = AccessGate::new(&table, Some(&guardian));
    assert!(guardian_gate.can("documents", "view", Some(Scope::Own)));
    assert!(!guardian_gate.can("financial", "view", Some(Scope::Own)));

    let coordinator_gate = AccessGate::new(&table, Some(&coordinator));
    assert!(coordinator_gate.can("evolutions", "approve", Some(Scope::Unit)));
    assert!(coordinator_gate.can("units", "view", Some(Scope::Global)));
}

#[test]
fn integration_exported_policy_reloads_to_identical_decisions() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("exported.json");
    let defaults = PermissionTable::clinic_defaults();
    write_text_atomic(&path, &render_permission_policy(&defaults).expect("render"))
        .expect("write export");
    let reloaded = load_permission_table(&path).expect("reload");

    for role in Role::ALL {
        let principal = Principal::new("p", role);
        for resource in RESOURCES {
            for action in ACTIONS {
                for scope in scopes() {
                    assert_eq!(
                        evaluate_permission(&defaults, Some(&principal), resource, action, scope),
                        evaluate_permission(&reloaded, Some(&principal), resource, action, scope),
                        "{role} {resource}:{action}@{scope:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn integration_shared_table_is_evaluated_concurrently() {
    let table = Arc::new(PermissionTable::clinic_defaults());
    let handles = Role::ALL
        .into_iter()
        .map(|role| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let principal = Principal::new(format!("{role}-worker"), role);
                (0..200)
                    .filter(|_| has_permission(&table, Some(&principal), "agenda", "view", None))
                    .count()
            })
        })
        .collect::<Vec<_>>();

    for (role, handle) in Role::ALL.into_iter().zip(handles) {
        assert_eq!(handle.join().expect("worker"), 200, "{role}");
    }
}
