use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::ParseScopeError;

/// Matches any resource or any action.
pub const WILDCARD: &str = "*";
/// Action value marking an explicit denial for a resource.
pub const DENY_ACTION: &str = "deny";

/// Breadth of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Own,
    Unit,
    Global,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Unit => "unit",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "own" => Ok(Self::Own),
            "unit" => Ok(Self::Unit),
            "global" => Ok(Self::Global),
            _ => Err(ParseScopeError(raw.trim().to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// One `(resource, action, scope)` rule attached to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub resource: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

impl Grant {
    pub fn allow(resource: impl Into<String>, action: impl Into<String>, scope: Option<Scope>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            scope,
        }
    }

    pub fn deny(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: DENY_ACTION.to_string(),
            scope: None,
        }
    }

    pub fn is_deny(&self) -> bool {
        self.action == DENY_ACTION
    }

    /// True when this grant is an explicit deny for exactly `resource`.
    pub fn denies(&self, resource: &str) -> bool {
        self.is_deny() && self.resource == resource
    }

    /// Allow-rule matching.
    ///
    /// An unscoped request matches regardless of the grant's scope. A scoped
    /// request matches a grant with the same scope or a `global` grant; a grant
    /// without scope never satisfies a scoped request.
    pub fn allows(&self, resource: &str, action: &str, scope: Option<Scope>) -> bool {
        let resource_matches = self.resource == WILDCARD || self.resource == resource;
        let action_matches = self.action == WILDCARD || self.action == action;
        let scope_matches = match scope {
            None => true,
            Some(requested) => {
                self.scope == Some(requested) || self.scope == Some(Scope::Global)
            }
        };
        resource_matches && action_matches && scope_matches
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(scope) => write!(f, "{}:{}@{}", self.resource, self.action, scope),
            None => write!(f, "{}:{}", self.resource, self.action),
        }
    }
}
