use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::{AccessError, StoreResult};
use crate::evaluator::AccessGate;
use crate::identity::IdentityProvider;
use crate::permission_table::PermissionTable;
use crate::principal::Principal;
use crate::selected_unit::SelectedUnitStore;
use crate::unit_store::UnitStore;
use crate::units::{Unit, UnitDirectory};

/// A signed-in principal plus the unit they are currently operating in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    principal: Principal,
    current_unit: Option<Unit>,
}

impl ActiveSession {
    /// Session with no unit selected yet.
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            current_unit: None,
        }
    }

    /// Session positioned on the first accessible unit, if any.
    pub fn start(principal: Principal, directory: &UnitDirectory) -> Self {
        let mut session = Self::new(principal);
        session.ensure_unit(directory);
        session
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn current_unit(&self) -> Option<&Unit> {
        self.current_unit.as_ref()
    }

    pub fn current_unit_id(&self) -> Option<&str> {
        self.current_unit.as_ref().map(|unit| unit.id.as_str())
    }

    /// Applies the initialization policy when no unit is selected.
    pub fn ensure_unit(&mut self, directory: &UnitDirectory) -> Option<&Unit> {
        if self.current_unit.is_none() {
            self.current_unit = directory.initial_unit(&self.principal).cloned();
        }
        self.current_unit.as_ref()
    }

    /// Returns a copy of this session moved to `unit_id`.
    pub fn with_unit(&self, directory: &UnitDirectory, unit_id: &str) -> Result<Self, AccessError> {
        let unit = self.resolve_accessible(directory, unit_id)?;
        Ok(Self {
            principal: self.principal.clone(),
            current_unit: Some(unit),
        })
    }

    /// Moves this session to `unit_id`; on error the session is left untouched.
    pub fn switch_unit(
        &mut self,
        directory: &UnitDirectory,
        unit_id: &str,
    ) -> Result<&Unit, AccessError> {
        let unit = self.resolve_accessible(directory, unit_id)?;
        Ok(&*self.current_unit.insert(unit))
    }

    pub fn gate<'a>(&'a self, table: &'a PermissionTable) -> AccessGate<'a> {
        AccessGate::new(table, Some(&self.principal))
    }

    fn resolve_accessible(&self, directory: &UnitDirectory, unit_id: &str) -> Result<Unit, AccessError> {
        directory
            .accessible_unit(&self.principal, unit_id)
            .cloned()
            .ok_or_else(|| AccessError::AccessDenied {
                principal_id: self.principal.id.clone(),
                unit_id: unit_id.to_string(),
            })
    }
}

/// Owns unit selection for sessions: validates switches against the current
/// directory snapshot and mirrors the choice into the selected-unit store.
///
/// Clones share one snapshot, so a [`UnitSwitcher::refresh`] is seen by all of them.
#[derive(Clone)]
pub struct UnitSwitcher {
    directory: Arc<ArcSwap<UnitDirectory>>,
    selection: Arc<dyn SelectedUnitStore>,
}

impl UnitSwitcher {
    pub fn new(directory: Arc<UnitDirectory>, selection: Arc<dyn SelectedUnitStore>) -> Self {
        Self {
            directory: Arc::new(ArcSwap::new(directory)),
            selection,
        }
    }

    /// Snapshot currently used to validate switches.
    pub fn directory(&self) -> Arc<UnitDirectory> {
        self.directory.load_full()
    }

    /// Reloads units from `store` and swaps the new snapshot in.
    ///
    /// On failure the current snapshot stays in place.
    pub async fn refresh(&self, store: &dyn UnitStore) -> Result<(), AccessError> {
        let mut next = UnitDirectory::new();
        next.load_units(store).await?;
        tracing::debug!(units = next.len(), "unit switcher snapshot replaced");
        self.directory.store(Arc::new(next));
        Ok(())
    }

    /// Switches `session` to `unit_id` and persists the selection.
    ///
    /// A failed save is logged; the in-memory switch stands.
    pub async fn switch(
        &self,
        session: &mut ActiveSession,
        unit_id: &str,
    ) -> Result<Unit, AccessError> {
        let directory = self.directory.load_full();
        let switched = session.switch_unit(&directory, unit_id).map(Unit::clone);
        let unit = match switched {
            Ok(unit) => unit,
            Err(error) => {
                tracing::info!(
                    principal = %session.principal().id,
                    unit = unit_id,
                    "unit switch rejected"
                );
                return Err(error);
            }
        };
        tracing::info!(principal = %session.principal().id, unit = %unit.id, "unit switched");
        if let Err(error) = self.selection.save_selected_unit(&unit.id).await {
            tracing::warn!(unit = %unit.id, error = %error, "failed to persist selected unit");
        }
        Ok(unit)
    }

    /// Builds a session for `principal`, restoring the persisted unit when it is
    /// still accessible and otherwise falling back to the first accessible unit.
    pub async fn restore(&self, principal: Principal) -> ActiveSession {
        let persisted = match self.selection.load_selected_unit().await {
            Ok(persisted) => persisted,
            Err(error) => {
                tracing::warn!(error = %error, "failed to load selected unit; using default");
                None
            }
        };

        let directory = self.directory.load_full();
        let mut session = ActiveSession::new(principal);
        if let Some(unit_id) = persisted {
            if session.switch_unit(&directory, &unit_id).is_ok() {
                tracing::debug!(unit = %unit_id, "restored selected unit");
                return session;
            }
            tracing::info!(
                principal = %session.principal().id,
                unit = %unit_id,
                "persisted unit no longer accessible; clearing"
            );
            if let Err(error) = self.selection.clear_selected_unit().await {
                tracing::warn!(error = %error, "failed to clear stale selected unit");
            }
        }
        session.ensure_unit(&directory);
        session
    }

    /// Resolves the signed-in principal and restores their session.
    pub async fn start_from_provider(
        &self,
        provider: &dyn IdentityProvider,
    ) -> Result<Option<ActiveSession>, AccessError> {
        let Some(principal) = provider
            .current_principal()
            .await
            .map_err(AccessError::Identity)?
        else {
            return Ok(None);
        };
        Ok(Some(self.restore(principal).await))
    }

    /// Forgets the persisted selection, e.g. on sign-out.
    pub async fn end_session(&self) -> StoreResult<()> {
        self.selection.clear_selected_unit().await.map_err(|error| {
            tracing::warn!(error = %error, "failed to clear selected unit");
            error
        })
    }
}
