use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clinic_core::{read_versioned_json_if_exists, write_json_atomic};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::blocking_io::run_blocking;
use crate::error::{StoreError, StoreResult};
use crate::units::Unit;

pub const UNITS_SCHEMA_VERSION: u32 = 1;
pub const UNITS_PATH_ENV: &str = "CLINIC_UNITS_PATH";

/// Source of the unit reference list.
#[async_trait]
pub trait UnitStore: Send + Sync {
    async fn fetch_units(&self) -> StoreResult<Vec<Unit>>;
}

/// In-memory unit source for tests and local experimentation.
#[derive(Debug, Default)]
pub struct InMemoryUnitStore {
    units: RwLock<Vec<Unit>>,
}

impl InMemoryUnitStore {
    pub fn new(units: Vec<Unit>) -> Self {
        Self {
            units: RwLock::new(units),
        }
    }

    pub async fn set_units(&self, units: Vec<Unit>) {
        *self.units.write().await = units;
    }
}

#[async_trait]
impl UnitStore for InMemoryUnitStore {
    async fn fetch_units(&self) -> StoreResult<Vec<Unit>> {
        Ok(self.units.read().await.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnitsFile {
    schema_version: u32,
    #[serde(default)]
    units: Vec<Unit>,
}

/// Units file on disk (`{"schema_version":1,"units":[...]}`).
///
/// Re-read on every fetch. A missing file yields an empty list.
#[derive(Debug, Clone)]
pub struct JsonFileUnitStore {
    path: PathBuf,
}

impl JsonFileUnitStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save_units(&self, units: &[Unit]) -> StoreResult<()> {
        validate_units(units)?;
        let file = UnitsFile {
            schema_version: UNITS_SCHEMA_VERSION,
            units: units.to_vec(),
        };
        write_json_atomic(&self.path, &file)?;
        Ok(())
    }
}

#[async_trait]
impl UnitStore for JsonFileUnitStore {
    async fn fetch_units(&self) -> StoreResult<Vec<Unit>> {
        let path = self.path.clone();
        let file = run_blocking(move || {
            Ok(read_versioned_json_if_exists::<UnitsFile>(
                &path,
                "units",
                UNITS_SCHEMA_VERSION,
            )?)
        })
        .await?;
        let Some(file) = file else {
            tracing::debug!(path = %self.path.display(), "units file missing; directory is empty");
            return Ok(Vec::new());
        };
        validate_units(&file.units)?;
        Ok(file.units)
    }
}

pub fn default_units_path() -> PathBuf {
    std::env::var(UNITS_PATH_ENV)
        .ok()
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".clinic/units.json"))
}

fn validate_units(units: &[Unit]) -> StoreResult<()> {
    let mut seen = BTreeSet::new();
    for unit in units {
        if unit.id.trim().is_empty() {
            return Err(StoreError::Invalid("unit id must not be empty".to_string()));
        }
        if !seen.insert(unit.id.as_str()) {
            return Err(StoreError::Invalid(format!(
                "duplicate unit id '{}'",
                unit.id
            )));
        }
    }
    Ok(())
}
