//! The closed catalog of admin permissions.
//!
//! Every permission is scoped by resource and action and serializes as a
//! dotted string (`users.edit`, `logs.clear`, ...). Roles and session tokens
//! carry lists of these; unknown strings are rejected at the boundary.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing a permission string fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The string is not in the permission catalog.
    #[error("unknown permission: {0}")]
    Unknown(String),
}

/// A single capability gating one action on one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "dashboard.view")]
    DashboardView,
    #[serde(rename = "dashboard.analytics")]
    DashboardAnalytics,

    #[serde(rename = "users.view")]
    UsersView,
    #[serde(rename = "users.create")]
    UsersCreate,
    #[serde(rename = "users.edit")]
    UsersEdit,
    #[serde(rename = "users.delete")]
    UsersDelete,
    #[serde(rename = "users.export")]
    UsersExport,

    #[serde(rename = "resumes.view")]
    ResumesView,
    #[serde(rename = "resumes.create")]
    ResumesCreate,
    #[serde(rename = "resumes.edit")]
    ResumesEdit,
    #[serde(rename = "resumes.delete")]
    ResumesDelete,
    #[serde(rename = "resumes.export")]
    ResumesExport,
    #[serde(rename = "resumes.import")]
    ResumesImport,

    #[serde(rename = "admins.view")]
    AdminsView,
    #[serde(rename = "admins.create")]
    AdminsCreate,
    #[serde(rename = "admins.edit")]
    AdminsEdit,
    #[serde(rename = "admins.delete")]
    AdminsDelete,
    #[serde(rename = "admins.roles")]
    AdminsRoles,

    #[serde(rename = "settings.view")]
    SettingsView,
    #[serde(rename = "settings.edit")]
    SettingsEdit,
    #[serde(rename = "settings.system")]
    SettingsSystem,

    #[serde(rename = "logs.view")]
    LogsView,
    #[serde(rename = "logs.clear")]
    LogsClear,

    #[serde(rename = "export.all")]
    ExportAll,
    #[serde(rename = "import.all")]
    ImportAll,
}

impl Permission {
    /// Every permission in catalog order.
    pub const ALL: [Self; 25] = [
        Self::DashboardView,
        Self::DashboardAnalytics,
        Self::UsersView,
        Self::UsersCreate,
        Self::UsersEdit,
        Self::UsersDelete,
        Self::UsersExport,
        Self::ResumesView,
        Self::ResumesCreate,
        Self::ResumesEdit,
        Self::ResumesDelete,
        Self::ResumesExport,
        Self::ResumesImport,
        Self::AdminsView,
        Self::AdminsCreate,
        Self::AdminsEdit,
        Self::AdminsDelete,
        Self::AdminsRoles,
        Self::SettingsView,
        Self::SettingsEdit,
        Self::SettingsSystem,
        Self::LogsView,
        Self::LogsClear,
        Self::ExportAll,
        Self::ImportAll,
    ];

    /// The catalog string for this permission.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DashboardView => "dashboard.view",
            Self::DashboardAnalytics => "dashboard.analytics",
            Self::UsersView => "users.view",
            Self::UsersCreate => "users.create",
            Self::UsersEdit => "users.edit",
            Self::UsersDelete => "users.delete",
            Self::UsersExport => "users.export",
            Self::ResumesView => "resumes.view",
            Self::ResumesCreate => "resumes.create",
            Self::ResumesEdit => "resumes.edit",
            Self::ResumesDelete => "resumes.delete",
            Self::ResumesExport => "resumes.export",
            Self::ResumesImport => "resumes.import",
            Self::AdminsView => "admins.view",
            Self::AdminsCreate => "admins.create",
            Self::AdminsEdit => "admins.edit",
            Self::AdminsDelete => "admins.delete",
            Self::AdminsRoles => "admins.roles",
            Self::SettingsView => "settings.view",
            Self::SettingsEdit => "settings.edit",
            Self::SettingsSystem => "settings.system",
            Self::LogsView => "logs.view",
            Self::LogsClear => "logs.clear",
            Self::ExportAll => "export.all",
            Self::ImportAll => "import.all",
        }
    }

    /// The resource half of the permission (`users` for `users.edit`).
    #[must_use]
    pub fn resource(self) -> &'static str {
        self.as_str().split('.').next().unwrap_or_default()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PermissionError::Unknown(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_catalog_entry() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>().unwrap(), permission);
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            "users.fly".parse::<Permission>(),
            Err(PermissionError::Unknown("users.fly".to_owned()))
        );
    }

    #[test]
    fn test_serde_uses_catalog_string() {
        let json = serde_json::to_string(&Permission::LogsClear).unwrap();
        assert_eq!(json, "\"logs.clear\"");

        let parsed: Vec<Permission> =
            serde_json::from_str(r#"["admins.roles","import.all"]"#).unwrap();
        assert_eq!(parsed, vec![Permission::AdminsRoles, Permission::ImportAll]);
    }

    #[test]
    fn test_serde_rejects_unknown() {
        assert!(serde_json::from_str::<Permission>("\"admins.everything\"").is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        for permission in Permission::ALL {
            let json = serde_json::to_string(&permission).unwrap();
            assert_eq!(json, format!("\"{permission}\""));
        }
    }

    #[test]
    fn test_resource() {
        assert_eq!(Permission::ResumesImport.resource(), "resumes");
        assert_eq!(Permission::ExportAll.resource(), "export");
    }
}
