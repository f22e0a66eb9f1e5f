use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::ParseRoleError;

/// Roles a clinic user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Coordinator,
    Therapist,
    Intern,
    Reception,
    Guardian,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Coordinator,
        Role::Therapist,
        Role::Intern,
        Role::Reception,
        Role::Guardian,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Coordinator => "coordinator",
            Self::Therapist => "therapist",
            Self::Intern => "intern",
            Self::Reception => "reception",
            Self::Guardian => "guardian",
        }
    }

    /// Display label shown to clinic staff.
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrador",
            Self::Coordinator => "Coordenador",
            Self::Therapist => "Terapeuta",
            Self::Intern => "Estagiário",
            Self::Reception => "Recepção",
            Self::Guardian => "Responsável",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| ParseRoleError(raw.trim().to_string()))
    }
}

/// Accepts the same spellings as [`FromStr`]: any case, surrounding whitespace ignored.
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// The authenticated actor, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub assigned_unit_ids: BTreeSet<String>,
    #[serde(default)]
    pub requires_supervision: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            assigned_unit_ids: BTreeSet::new(),
            requires_supervision: false,
        }
    }

    pub fn with_units<I, S>(mut self, unit_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assigned_unit_ids
            .extend(unit_ids.into_iter().map(Into::into));
        self
    }

    pub fn with_supervision(mut self, requires_supervision: bool) -> Self {
        self.requires_supervision = requires_supervision;
        self
    }

    pub fn is_assigned_to(&self, unit_id: &str) -> bool {
        self.assigned_unit_ids.contains(unit_id)
    }
}

/// Encodes a principal id as a filesystem-safe path component.
///
/// Bytes outside `[a-z0-9_-]` become `%XX`, so distinct ids (including ids that
/// differ only in case) never share a component. The empty id maps to `%`,
/// which no non-empty id can produce.
pub(crate) fn encode_principal_component(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => encoded.push(char::from(byte)),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
