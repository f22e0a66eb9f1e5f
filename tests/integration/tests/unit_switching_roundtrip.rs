use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use clinic_access::{
    ActiveSession, FileSelectedUnitStore, JsonFileIdentityProvider, JsonFileUnitStore,
    PermissionTable, Principal, Role, Scope, SelectedUnitStore, StoreError, StoreResult, Unit,
    UnitDirectory, UnitStore, UnitSwitcher,
};
use clinic_core::write_json_atomic;
use tempfile::tempdir;

fn clinic_units() -> Vec<Unit> {
    vec![
        Unit::new("unit-centro", "Centro", true),
        Unit::new("unit-norte", "Norte", false),
        Unit::new("unit-sul", "Sul", true),
    ]
}

async fn load_directory(store: &dyn UnitStore) -> Arc<UnitDirectory> {
    let mut directory = UnitDirectory::new();
    directory.load_units(store).await.expect("load units");
    Arc::new(directory)
}

/// Serves units once, then reports the backend as unavailable.
struct FlakyUnitStore {
    units: Vec<Unit>,
    served: AtomicBool,
}

#[async_trait]
impl UnitStore for FlakyUnitStore {
    async fn fetch_units(&self) -> StoreResult<Vec<Unit>> {
        if self.served.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("units backend offline".to_string()));
        }
        Ok(self.units.clone())
    }
}

#[tokio::test]
async fn integration_selected_unit_survives_restart_through_file_stores() {
    let temp = tempdir().expect("tempdir");
    let units_store = JsonFileUnitStore::new(temp.path().join("units.json"));
    units_store.save_units(&clinic_units()).expect("seed units");
    let principal_path = temp.path().join("principal.json");
    write_json_atomic(
        &principal_path,
        &Principal::new("coord-1", Role::Coordinator).with_units(["unit-centro", "unit-sul"]),
    )
    .expect("write principal");
    let state_dir = temp.path().join("state");
    let provider = JsonFileIdentityProvider::new(&principal_path);

    let directory = load_directory(&units_store).await;
    let switcher = UnitSwitcher::new(
        Arc::clone(&directory),
        Arc::new(FileSelectedUnitStore::for_principal(&state_dir, "coord-1")),
    );
    let mut session = switcher
        .start_from_provider(&provider)
        .await
        .expect("start")
        .expect("signed in");
    assert_eq!(session.current_unit_id(), Some("unit-centro"));
    let switched = switcher.switch(&mut session, "unit-sul").await.expect("switch");
    assert_eq!(switched.name, "Sul");

    // Fresh process: new directory snapshot, new store handle on the same state dir.
    let directory = load_directory(&units_store).await;
    let switcher = UnitSwitcher::new(
        directory,
        Arc::new(FileSelectedUnitStore::for_principal(&state_dir, "coord-1")),
    );
    let restored = switcher
        .start_from_provider(&provider)
        .await
        .expect("restart")
        .expect("signed in");
    assert_eq!(restored.current_unit_id(), Some("unit-sul"));

    switcher.end_session().await.expect("end session");
    let fresh = switcher
        .start_from_provider(&provider)
        .await
        .expect("after sign-out")
        .expect("signed in");
    assert_eq!(fresh.current_unit_id(), Some("unit-centro"));
}

#[tokio::test]
async fn integration_denied_switches_leave_session_and_selection_untouched() {
    let temp = tempdir().expect("tempdir");
    let directory = Arc::new(UnitDirectory::from_units(clinic_units()));
    let selection = FileSelectedUnitStore::for_principal(temp.path(), "therapist-1");
    let switcher = UnitSwitcher::new(Arc::clone(&directory), Arc::new(selection.clone()));
    let therapist =
        Principal::new("therapist-1", Role::Therapist).with_units(["unit-centro", "unit-norte"]);

    let mut session = switcher.restore(therapist).await;
    let before = session.clone();
    for target in ["unit-norte", "unit-sul", "unit-missing"] {
        let error = switcher
            .switch(&mut session, target)
            .await
            .expect_err("switch must be rejected");
        assert!(error.is_access_denied(), "{target}: {error}");
        assert_eq!(session, before);
    }
    assert_eq!(selection.load_selected_unit().await.expect("load"), None);
    assert!(!selection.path().exists());
}

#[tokio::test]
async fn integration_stale_persisted_unit_is_discarded_after_reassignment() {
    let temp = tempdir().expect("tempdir");
    let directory = Arc::new(UnitDirectory::from_units(clinic_units()));
    let selection = FileSelectedUnitStore::for_principal(temp.path(), "intern-1");
    selection
        .save_selected_unit("unit-sul")
        .await
        .expect("seed selection");
    let switcher = UnitSwitcher::new(directory, Arc::new(selection.clone()));

    let reassigned = Principal::new("intern-1", Role::Intern)
        .with_units(["unit-centro"])
        .with_supervision(true);
    let session = switcher.restore(reassigned).await;
    assert_eq!(session.current_unit_id(), Some("unit-centro"));
    assert_eq!(selection.load_selected_unit().await.expect("load"), None);
}

#[tokio::test]
async fn integration_failed_reload_keeps_switching_against_previous_snapshot() {
    let store = FlakyUnitStore {
        units: clinic_units(),
        served: AtomicBool::new(false),
    };
    let mut directory = UnitDirectory::new();
    directory.load_units(&store).await.expect("first load");
    let loaded_at = directory.loaded_at_unix_ms();

    let error = directory.load_units(&store).await.expect_err("backend offline");
    assert!(!error.is_access_denied());
    assert_eq!(directory.len(), 3);
    assert_eq!(directory.loaded_at_unix_ms(), loaded_at);

    let principal = Principal::new("rec-1", Role::Reception).with_units(["unit-sul"]);
    let mut session = ActiveSession::start(principal, &directory);
    assert_eq!(session.current_unit_id(), Some("unit-sul"));
    assert!(session.switch_unit(&directory, "unit-centro").is_err());
}

#[tokio::test]
async fn integration_session_gate_applies_role_grants_in_the_active_unit() {
    let directory = UnitDirectory::from_units(clinic_units());
    let table = PermissionTable::clinic_defaults();

    let reception = ActiveSession::start(
        Principal::new("rec-1", Role::Reception).with_units(["unit-centro"]),
        &directory,
    );
    let gate = reception.gate(&table);
    assert!(gate.can("agenda", "create", Some(Scope::Unit)));
    assert!(!gate.can("clinical_records", "view", Some(Scope::Unit)));

    let guardian = ActiveSession::start(Principal::new("resp-1", Role::Guardian), &directory);
    assert_eq!(guardian.current_unit(), None);
    assert!(guardian.gate(&table).can("documents", "view", Some(Scope::Own)));
    assert!(directory.accessible_units(Some(guardian.principal())).is_empty());
    assert!(directory.accessible_units(None).is_empty());
}

#[tokio::test]
async fn integration_principals_with_similar_ids_do_not_clear_each_others_selection() {
    let temp = tempdir().expect("tempdir");
    let directory = Arc::new(UnitDirectory::from_units(clinic_units()));
    let switcher_for = |principal_id: &str| {
        UnitSwitcher::new(
            Arc::clone(&directory),
            Arc::new(FileSelectedUnitStore::for_principal(temp.path(), principal_id)),
        )
    };

    let dotted = Principal::new("Ana.Souza", Role::Coordinator).with_units(["unit-centro", "unit-sul"]);
    let dotted_switcher = switcher_for(&dotted.id);
    let mut session = dotted_switcher.restore(dotted.clone()).await;
    dotted_switcher
        .switch(&mut session, "unit-sul")
        .await
        .expect("switch");

    let dashed = Principal::new("ana-souza", Role::Therapist).with_units(["unit-centro"]);
    let dashed_session = switcher_for(&dashed.id).restore(dashed).await;
    assert_eq!(dashed_session.current_unit_id(), Some("unit-centro"));

    let restored = switcher_for(&dotted.id).restore(dotted).await;
    assert_eq!(restored.current_unit_id(), Some("unit-sul"));
}
