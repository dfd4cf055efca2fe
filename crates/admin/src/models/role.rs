//! Role domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use folio_core::{BuiltinRole, Permission, RoleId};

/// A named, reusable bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Unique uppercase code (`SUPER_ADMIN`).
    pub code: String,
    pub description: String,
    pub permissions: Vec<Permission>,
    /// Assigned to accounts created without an explicit role.
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// The lowercase label stored on admin accounts.
    #[must_use]
    pub fn label(&self) -> String {
        self.code.to_lowercase()
    }
}

/// A role ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub code: String,
    pub description: String,
    pub permissions: Vec<Permission>,
    pub is_default: bool,
}

impl From<BuiltinRole> for NewRole {
    fn from(role: BuiltinRole) -> Self {
        Self {
            name: role.name().to_owned(),
            code: role.code().to_owned(),
            description: role.description().to_owned(),
            permissions: role.permissions(),
            is_default: role.is_default(),
        }
    }
}
