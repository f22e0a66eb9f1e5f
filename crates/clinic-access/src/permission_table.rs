use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::grant::{Grant, Scope};
use crate::principal::Role;

/// Role → grants mapping, immutable once built.
///
/// Grant order carries no meaning: matching allow rules are OR'd and any deny
/// for the requested resource wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    grants: BTreeMap<Role, Vec<Grant>>,
}

impl PermissionTable {
    /// Builds a table; repeated roles have their grants appended.
    pub fn from_grants<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Role, Vec<Grant>)>,
    {
        let mut grants: BTreeMap<Role, Vec<Grant>> = BTreeMap::new();
        for (role, role_grants) in entries {
            grants.entry(role).or_default().extend(role_grants);
        }
        Self { grants }
    }

    /// Grants configured for `role`; empty when the role has no entry.
    pub fn grants_for(&self, role: Role) -> &[Grant] {
        self.grants.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.grants.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.values().all(Vec::is_empty)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (Role, &[Grant])> + '_ {
        self.grants
            .iter()
            .map(|(role, grants)| (*role, grants.as_slice()))
    }

    /// Built-in grants for a clinic deployment.
    pub fn clinic_defaults() -> Self {
        use Scope::{Global, Own, Unit};

        let allow = |resource: &str, action: &str, scope: Scope| {
            Grant::allow(resource, action, Some(scope))
        };

        Self::from_grants([
            (
                Role::Coordinator,
                vec![
                    allow("patients", "*", Unit),
                    allow("agenda", "*", Unit),
                    allow("supervision", "*", Unit),
                    allow("evolutions", "view", Unit),
                    allow("evolutions", "approve", Unit),
                    allow("clinical_records", "view", Unit),
                    allow("documents", "view", Unit),
                    allow("reports", "view", Unit),
                    allow("financial", "view", Unit),
                    allow("users", "view", Unit),
                    allow("units", "view", Global),
                ],
            ),
            (
                Role::Therapist,
                vec![
                    allow("patients", "view", Own),
                    allow("patients", "edit", Own),
                    allow("agenda", "view", Own),
                    allow("agenda", "create", Own),
                    allow("agenda", "edit", Own),
                    allow("evolutions", "view", Own),
                    allow("evolutions", "create", Own),
                    allow("evolutions", "edit", Own),
                    allow("clinical_records", "view", Own),
                    allow("clinical_records", "edit", Own),
                    allow("documents", "view", Own),
                    allow("documents", "create", Own),
                    allow("supervision", "view", Own),
                ],
            ),
            (
                Role::Intern,
                vec![
                    allow("patients", "view", Own),
                    allow("agenda", "view", Own),
                    allow("evolutions", "view", Own),
                    allow("evolutions", "create", Own),
                    allow("clinical_records", "view", Own),
                    allow("supervision", "view", Own),
                    allow("supervision", "request", Own),
                    Grant::deny("financial"),
                    Grant::deny("reports"),
                ],
            ),
            (
                Role::Reception,
                vec![
                    allow("patients", "view", Unit),
                    allow("patients", "create", Unit),
                    allow("patients", "edit", Unit),
                    allow("agenda", "*", Unit),
                    allow("financial", "view", Unit),
                    Grant::deny("clinical_records"),
                    Grant::deny("evolutions"),
                ],
            ),
            (
                Role::Guardian,
                vec![
                    allow("patients", "view", Own),
                    allow("agenda", "view", Own),
                    allow("documents", "view", Own),
                    Grant::deny("clinical_records"),
                    Grant::deny("evolutions"),
                    Grant::deny("financial"),
                ],
            ),
        ])
    }
}

/// Process-wide built-in table, built on first use and never torn down.
pub fn default_permission_table() -> &'static PermissionTable {
    static TABLE: OnceLock<PermissionTable> = OnceLock::new();
    TABLE.get_or_init(PermissionTable::clinic_defaults)
}
