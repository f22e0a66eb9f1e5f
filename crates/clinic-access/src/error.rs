use thiserror::Error;

/// Result type for collaborator store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by identity, unit and selected-unit stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid store payload: {0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    State(#[from] anyhow::Error),
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors surfaced by the unit directory and the unit switcher.
///
/// Permission denials are never errors; see [`crate::PermissionDecision`].
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("access denied: principal '{principal_id}' cannot operate in unit '{unit_id}'")]
    AccessDenied {
        principal_id: String,
        unit_id: String,
    },
    #[error("failed to load unit directory: {0}")]
    UnitLoad(#[source] StoreError),
    #[error("failed to resolve principal: {0}")]
    Identity(#[source] StoreError),
}

impl AccessError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

/// Returned when a role name does not match any known clinic role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}': expected admin|coordinator|therapist|intern|reception|guardian")]
pub struct ParseRoleError(pub String);

/// Returned when a scope name is not one of `own`, `unit`, `global`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scope '{0}': expected own|unit|global")]
pub struct ParseScopeError(pub String);
