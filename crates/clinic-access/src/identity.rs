use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clinic_core::read_json_if_exists;
use tokio::sync::RwLock;

use crate::blocking_io::run_blocking;
use crate::error::StoreResult;
use crate::principal::Principal;

pub const PRINCIPAL_PATH_ENV: &str = "CLINIC_PRINCIPAL_PATH";

/// Supplies the currently authenticated principal, if any.
///
/// Implementations must not cache a principal past sign-out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_principal(&self) -> StoreResult<Option<Principal>>;
}

#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    principal: RwLock<Option<Principal>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(principal: Principal) -> Self {
        Self {
            principal: RwLock::new(Some(principal)),
        }
    }

    pub async fn sign_in(&self, principal: Principal) {
        tracing::info!(principal = %principal.id, role = %principal.role, "principal signed in");
        *self.principal.write().await = Some(principal);
    }

    pub async fn sign_out(&self) {
        if let Some(previous) = self.principal.write().await.take() {
            tracing::info!(principal = %previous.id, "principal signed out");
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_principal(&self) -> StoreResult<Option<Principal>> {
        Ok(self.principal.read().await.clone())
    }
}

/// Reads the principal from a JSON file on every call; a missing file means signed out.
#[derive(Debug, Clone)]
pub struct JsonFileIdentityProvider {
    path: PathBuf,
}

impl JsonFileIdentityProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IdentityProvider for JsonFileIdentityProvider {
    async fn current_principal(&self) -> StoreResult<Option<Principal>> {
        let path = self.path.clone();
        run_blocking(move || Ok(read_json_if_exists::<Principal>(&path)?)).await
    }
}

#[cfg(test)]
mod tests {
    use super::{IdentityProvider, InMemoryIdentityProvider, JsonFileIdentityProvider};
    use crate::principal::{Principal, Role};
    use tempfile::tempdir;

    #[tokio::test]
    async fn functional_in_memory_provider_forgets_principal_on_sign_out() {
        let provider = InMemoryIdentityProvider::new();
        assert!(provider.current_principal().await.expect("read").is_none());

        provider
            .sign_in(Principal::new("user-1", Role::Reception).with_units(["unit-centro"]))
            .await;
        let principal = provider
            .current_principal()
            .await
            .expect("read")
            .expect("signed in");
        assert_eq!(principal.role, Role::Reception);

        provider.sign_out().await;
        assert!(provider.current_principal().await.expect("read").is_none());
    }

    #[tokio::test]
    async fn integration_file_provider_rereads_principal_on_each_call() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("principal.json");
        let provider = JsonFileIdentityProvider::new(&path);
        assert!(provider.current_principal().await.expect("missing").is_none());

        std::fs::write(
            &path,
            r#"{"id":"user-9","role":"therapist","assignedUnitIds":["unit-centro"]}"#,
        )
        .expect("write");
        let first = provider.current_principal().await.expect("read").expect("present");
        assert_eq!(first.role, Role::Therapist);

        std::fs::write(&path, r#"{"id":"user-9","role":"coordinator"}"#).expect("rewrite");
        let second = provider.current_principal().await.expect("read").expect("present");
        assert_eq!(second.role, Role::Coordinator);
    }

    #[tokio::test]
    async fn regression_file_provider_surfaces_unknown_role_as_store_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("principal.json");
        std::fs::write(&path, r#"{"id":"user-9","role":"root"}"#).expect("write");
        let error = JsonFileIdentityProvider::new(&path)
            .current_principal()
            .await
            .expect_err("unknown role");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[tokio::test]
    async fn functional_file_provider_accepts_capitalized_role_names() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("principal.json");
        std::fs::write(&path, r#"{"id":"user-5","role":"Therapist"}"#).expect("write");
        let principal = JsonFileIdentityProvider::new(&path)
            .current_principal()
            .await
            .expect("read")
            .expect("present");
        assert_eq!(principal.role, Role::Therapist);
    }
}
