use serde::Serialize;

use crate::grant::{Grant, Scope};
use crate::permission_table::PermissionTable;
use crate::principal::Principal;

pub const ALLOW_ADMIN_ROLE: &str = "allow_admin_role";
pub const ALLOW_MATCHING_GRANT: &str = "allow_matching_grant";
pub const DENY_PRINCIPAL_MISSING: &str = "deny_principal_missing";
pub const DENY_EXPLICIT_RESOURCE_DENY: &str = "deny_explicit_resource_deny";
pub const DENY_NO_MATCHING_GRANT: &str = "deny_no_matching_grant";

/// Outcome of a permission check, with a stable reason code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PermissionDecision {
    Allow {
        reason_code: &'static str,
        matched_grant: Option<Grant>,
    },
    Deny {
        reason_code: &'static str,
        matched_grant: Option<Grant>,
    },
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Allow { reason_code, .. } | Self::Deny { reason_code, .. } => *reason_code,
        }
    }

    pub fn matched_grant(&self) -> Option<&Grant> {
        match self {
            Self::Allow { matched_grant, .. } | Self::Deny { matched_grant, .. } => {
                matched_grant.as_ref()
            }
        }
    }

    pub fn label(&self) -> &'static str {
        if self.is_allowed() {
            "allow"
        } else {
            "deny"
        }
    }
}

/// Decides whether `principal` may perform `action` on `resource`.
///
/// Fails closed on a missing principal. Admin bypasses the table. Any deny for
/// the resource wins over every allow, independent of grant order.
pub fn evaluate_permission(
    table: &PermissionTable,
    principal: Option<&Principal>,
    resource: &str,
    action: &str,
    scope: Option<Scope>,
) -> PermissionDecision {
    let Some(principal) = principal else {
        return PermissionDecision::Deny {
            reason_code: DENY_PRINCIPAL_MISSING,
            matched_grant: None,
        };
    };
    if principal.role.is_admin() {
        return PermissionDecision::Allow {
            reason_code: ALLOW_ADMIN_ROLE,
            matched_grant: None,
        };
    }

    let grants = table.grants_for(principal.role);
    if let Some(deny) = grants.iter().find(|grant| grant.denies(resource)) {
        return PermissionDecision::Deny {
            reason_code: DENY_EXPLICIT_RESOURCE_DENY,
            matched_grant: Some(deny.clone()),
        };
    }

    match grants
        .iter()
        .find(|grant| grant.allows(resource, action, scope))
    {
        Some(grant) => PermissionDecision::Allow {
            reason_code: ALLOW_MATCHING_GRANT,
            matched_grant: Some(grant.clone()),
        },
        None => PermissionDecision::Deny {
            reason_code: DENY_NO_MATCHING_GRANT,
            matched_grant: None,
        },
    }
}

pub fn has_permission(
    table: &PermissionTable,
    principal: Option<&Principal>,
    resource: &str,
    action: &str,
    scope: Option<Scope>,
) -> bool {
    evaluate_permission(table, principal, resource, action, scope).is_allowed()
}

/// Injected view over a table and the current principal for feature gates.
#[derive(Debug, Clone, Copy)]
pub struct AccessGate<'a> {
    table: &'a PermissionTable,
    principal: Option<&'a Principal>,
}

impl<'a> AccessGate<'a> {
    pub fn new(table: &'a PermissionTable, principal: Option<&'a Principal>) -> Self {
        Self { table, principal }
    }

    pub fn principal(&self) -> Option<&'a Principal> {
        self.principal
    }

    pub fn can(&self, resource: &str, action: &str, scope: Option<Scope>) -> bool {
        has_permission(self.table, self.principal, resource, action, scope)
    }

    pub fn decide(&self, resource: &str, action: &str, scope: Option<Scope>) -> PermissionDecision {
        evaluate_permission(self.table, self.principal, resource, action, scope)
    }
}
