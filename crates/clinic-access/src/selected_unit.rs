use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clinic_core::{current_unix_timestamp_ms, read_versioned_json_if_exists, write_json_atomic};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::blocking_io::run_blocking;
use crate::error::StoreResult;
use crate::principal::encode_principal_component;

pub const SELECTED_UNIT_SCHEMA_VERSION: u32 = 1;
pub const STATE_DIR_ENV: &str = "CLINIC_STATE_DIR";

/// Key-value persistence for the last selected unit.
///
/// Stored ids are hints only; callers re-validate them against the directory.
#[async_trait]
pub trait SelectedUnitStore: Send + Sync {
    async fn save_selected_unit(&self, unit_id: &str) -> StoreResult<()>;
    async fn load_selected_unit(&self) -> StoreResult<Option<String>>;
    async fn clear_selected_unit(&self) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemorySelectedUnitStore {
    selected: RwLock<Option<String>>,
}

impl InMemorySelectedUnitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(unit_id: impl Into<String>) -> Self {
        Self {
            selected: RwLock::new(Some(unit_id.into())),
        }
    }
}

#[async_trait]
impl SelectedUnitStore for InMemorySelectedUnitStore {
    async fn save_selected_unit(&self, unit_id: &str) -> StoreResult<()> {
        *self.selected.write().await = Some(unit_id.to_string());
        Ok(())
    }

    async fn load_selected_unit(&self) -> StoreResult<Option<String>> {
        Ok(self.selected.read().await.clone())
    }

    async fn clear_selected_unit(&self) -> StoreResult<()> {
        self.selected.write().await.take();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct SelectedUnitFile {
    schema_version: u32,
    unit_id: String,
    saved_unix_ms: u64,
}

/// Selected unit persisted as a small JSON file, one file per principal.
#[derive(Debug, Clone)]
pub struct FileSelectedUnitStore {
    path: PathBuf,
}

impl FileSelectedUnitStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<state_dir>/sessions/<principal>/selected-unit.json`
    pub fn for_principal(state_dir: &Path, principal_id: &str) -> Self {
        Self::new(
            state_dir
                .join("sessions")
                .join(encode_principal_component(principal_id))
                .join("selected-unit.json"),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SelectedUnitStore for FileSelectedUnitStore {
    async fn save_selected_unit(&self, unit_id: &str) -> StoreResult<()> {
        let path = self.path.clone();
        let file = SelectedUnitFile {
            schema_version: SELECTED_UNIT_SCHEMA_VERSION,
            unit_id: unit_id.to_string(),
            saved_unix_ms: current_unix_timestamp_ms(),
        };
        run_blocking(move || Ok(write_json_atomic(&path, &file)?)).await
    }

    async fn load_selected_unit(&self) -> StoreResult<Option<String>> {
        let path = self.path.clone();
        let file = run_blocking(move || {
            Ok(read_versioned_json_if_exists::<SelectedUnitFile>(
                &path,
                "selected unit",
                SELECTED_UNIT_SCHEMA_VERSION,
            )?)
        })
        .await?;
        Ok(file
            .map(|file| file.unit_id)
            .filter(|unit_id| !unit_id.trim().is_empty()))
    }

    async fn clear_selected_unit(&self) -> StoreResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

pub fn default_state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV)
        .ok()
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".clinic/state"))
}
