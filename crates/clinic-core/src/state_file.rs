use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SchemaHeader {
    schema_version: Option<u32>,
}

/// Reads and parses a JSON state file, returning `None` when the file does not exist.
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = serde_json::from_str::<T>(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(parsed))
}

/// Like [`read_json_if_exists`], but first checks the `schema_version` field.
///
/// A missing field is treated as a mismatch so unversioned files fail closed.
pub fn read_versioned_json_if_exists<T: DeserializeOwned>(
    path: &Path,
    kind: &str,
    expected_version: u32,
) -> Result<Option<T>> {
    let Some(raw) = read_json_if_exists::<serde_json::Value>(path)? else {
        return Ok(None);
    };
    let header = serde_json::from_value::<SchemaHeader>(raw.clone())
        .with_context(|| format!("failed to parse {kind} header in {}", path.display()))?;
    match header.schema_version {
        Some(version) if version == expected_version => {}
        Some(version) => bail!(
            "unsupported {kind} schema_version {version} in {} (expected {expected_version})",
            path.display()
        ),
        None => bail!(
            "{kind} file {} is missing schema_version (expected {expected_version})",
            path.display()
        ),
    }
    let parsed = serde_json::from_value::<T>(raw)
        .with_context(|| format!("failed to parse {kind} file {}", path.display()))?;
    Ok(Some(parsed))
}
