use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clinic_core::read_versioned_json_if_exists;
use serde::{Deserialize, Serialize};

use crate::grant::{Grant, WILDCARD};
use crate::permission_table::PermissionTable;
use crate::principal::Role;

pub const PERMISSION_POLICY_SCHEMA_VERSION: u32 = 1;
pub const PERMISSION_POLICY_PATH_ENV: &str = "CLINIC_ACCESS_POLICY_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct PermissionPolicyFile {
    schema_version: u32,
    #[serde(default)]
    roles: BTreeMap<String, Vec<Grant>>,
}

pub fn default_permission_policy_path() -> PathBuf {
    std::env::var(PERMISSION_POLICY_PATH_ENV)
        .ok()
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".clinic/security/permissions.json"))
}

/// Loads the role table from `path`, falling back to the built-in clinic grants
/// when the file does not exist.
pub fn load_permission_table(path: &Path) -> Result<PermissionTable> {
    let Some(policy) = read_versioned_json_if_exists::<PermissionPolicyFile>(
        path,
        "permission policy",
        PERMISSION_POLICY_SCHEMA_VERSION,
    )?
    else {
        tracing::debug!(path = %path.display(), "permission policy missing; using clinic defaults");
        return Ok(PermissionTable::clinic_defaults());
    };
    let table = policy_into_table(policy)
        .with_context(|| format!("invalid permission policy {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        roles = table.roles().count(),
        "permission policy loaded"
    );
    Ok(table)
}

/// Renders `table` in the policy file format.
pub fn render_permission_policy(table: &PermissionTable) -> Result<String> {
    let policy = PermissionPolicyFile {
        schema_version: PERMISSION_POLICY_SCHEMA_VERSION,
        roles: table
            .entries()
            .map(|(role, grants)| (role.as_str().to_string(), grants.to_vec()))
            .collect(),
    };
    let mut payload =
        serde_json::to_string_pretty(&policy).context("failed to encode permission policy")?;
    payload.push('\n');
    Ok(payload)
}

fn policy_into_table(policy: PermissionPolicyFile) -> Result<PermissionTable> {
    let mut entries = Vec::with_capacity(policy.roles.len());
    for (role_name, grants) in policy.roles {
        let role = role_name
            .parse::<Role>()
            .with_context(|| format!("invalid role key '{role_name}'"))?;
        if role.is_admin() {
            bail!("role 'admin' is implicitly granted everything and must not be configured");
        }
        for grant in &grants {
            validate_grant(role, grant)?;
        }
        entries.push((role, grants));
    }
    Ok(PermissionTable::from_grants(entries))
}

fn validate_grant(role: Role, grant: &Grant) -> Result<()> {
    if grant.resource.trim().is_empty() {
        bail!("role '{role}' contains a grant with an empty resource");
    }
    if grant.action.trim().is_empty() {
        bail!(
            "role '{role}' grant for resource '{}' has an empty action",
            grant.resource
        );
    }
    if grant.is_deny() {
        if grant.resource == WILDCARD {
            bail!("role '{role}' deny grants must name a concrete resource");
        }
        if let Some(scope) = grant.scope {
            bail!(
                "role '{role}' deny grant for '{}' must not carry a scope (found '{scope}')",
                grant.resource
            );
        }
    }
    Ok(())
}
