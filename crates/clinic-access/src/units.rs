use std::collections::BTreeSet;

use clinic_core::current_unix_timestamp_ms;
use serde::{Deserialize, Serialize};

use crate::error::AccessError;
use crate::principal::Principal;
use crate::unit_store::UnitStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: "08:00".to_string(),
            end: "18:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSettings {
    #[serde(default)]
    pub working_hours: WorkingHours,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub specialties: BTreeSet<String>,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            working_hours: WorkingHours::default(),
            timezone: default_timezone(),
            specialties: BTreeSet::new(),
        }
    }
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

/// A clinic location; the tenant boundary for unit-scoped data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    pub active: bool,
    #[serde(default)]
    pub settings: UnitSettings,
}

impl Unit {
    pub fn new(id: impl Into<String>, name: impl Into<String>, active: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: String::new(),
            phone: String::new(),
            active,
            settings: UnitSettings::default(),
        }
    }
}

/// In-memory snapshot of the unit reference list.
///
/// Refreshes replace the whole snapshot; lookups preserve directory order.
#[derive(Debug, Clone, Default)]
pub struct UnitDirectory {
    units: Vec<Unit>,
    loaded_at_unix_ms: Option<u64>,
}

impl UnitDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units(units: Vec<Unit>) -> Self {
        let mut directory = Self::new();
        directory.replace(units);
        directory
    }

    pub fn replace(&mut self, units: Vec<Unit>) {
        self.units = units;
        self.loaded_at_unix_ms = Some(current_unix_timestamp_ms());
    }

    /// Fetches units from `store` and swaps the snapshot in.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn load_units(&mut self, store: &dyn UnitStore) -> Result<&[Unit], AccessError> {
        let units = store.fetch_units().await.map_err(|error| {
            tracing::warn!(error = %error, "unit directory refresh failed");
            AccessError::UnitLoad(error)
        })?;
        tracing::debug!(units = units.len(), "unit directory refreshed");
        self.replace(units);
        Ok(&self.units)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// `None` until the first snapshot is installed.
    pub fn loaded_at_unix_ms(&self) -> Option<u64> {
        self.loaded_at_unix_ms
    }

    pub fn get(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == unit_id)
    }

    /// Active units the principal is assigned to, in directory order.
    pub fn accessible_units(&self, principal: Option<&Principal>) -> Vec<&Unit> {
        let Some(principal) = principal else {
            return Vec::new();
        };
        self.units
            .iter()
            .filter(|unit| unit.active && principal.is_assigned_to(&unit.id))
            .collect()
    }

    pub fn accessible_unit(&self, principal: &Principal, unit_id: &str) -> Option<&Unit> {
        self.accessible_units(Some(principal))
            .into_iter()
            .find(|unit| unit.id == unit_id)
    }

    /// Unit selected when a session has no current unit yet.
    pub fn initial_unit(&self, principal: &Principal) -> Option<&Unit> {
        self.accessible_units(Some(principal)).into_iter().next()
    }
}
