//! Authenticated request identity.

use serde::Serialize;

use folio_core::{AdminId, Email, Permission};

use super::Admin;

/// The admin behind a verified session token.
///
/// Built from the freshly loaded account, so role and permissions reflect
/// the store rather than the token snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAdmin {
    pub id: AdminId,
    pub email: Email,
    pub name: String,
    pub role: String,
    pub permissions: Vec<Permission>,
}

impl CurrentAdmin {
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

impl From<Admin> for CurrentAdmin {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            name: admin.name,
            role: admin.role,
            permissions: admin.permissions,
        }
    }
}

/// Where a request came from, recorded on logins and audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Audit metadata fields for this client.
    #[must_use]
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "ip": self.ip,
            "userAgent": self.user_agent,
        })
    }
}
