//! Built-in role definitions.
//!
//! Four roles are seeded into every database. Each has an uppercase code
//! (`SUPER_ADMIN`) used for lookups and a lowercase label (`super_admin`)
//! stored on admin accounts.

use core::fmt;

use crate::Permission;

/// One of the four roles shipped with the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinRole {
    /// Full access, including admin account management.
    SuperAdmin,
    /// Content and user management.
    Admin,
    /// View and edit resumes and users.
    Moderator,
    /// Read-only. Assigned when no role is given.
    Viewer,
}

impl BuiltinRole {
    /// All built-in roles, most privileged first.
    pub const ALL: [Self; 4] = [Self::SuperAdmin, Self::Admin, Self::Moderator, Self::Viewer];

    /// Uppercase role code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Admin => "ADMIN",
            Self::Moderator => "MODERATOR",
            Self::Viewer => "VIEWER",
        }
    }

    /// Lowercase label stored on admin accounts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::Viewer => "viewer",
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::Admin => "Admin",
            Self::Moderator => "Moderator",
            Self::Viewer => "Viewer",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SuperAdmin => "Full access to every feature, including admin accounts and roles",
            Self::Admin => "Manages users, resumes and content; cannot manage admin accounts",
            Self::Moderator => "Views and edits users and resumes; cannot delete",
            Self::Viewer => "Read-only access to the dashboard, users and resumes",
        }
    }

    /// Whether this is the role assigned to accounts created without one.
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Viewer)
    }

    /// The permission set granted by this role.
    #[must_use]
    pub fn permissions(self) -> Vec<Permission> {
        use Permission as P;

        match self {
            Self::SuperAdmin => P::ALL.to_vec(),
            Self::Admin => vec![
                P::DashboardView,
                P::DashboardAnalytics,
                P::UsersView,
                P::UsersCreate,
                P::UsersEdit,
                P::UsersDelete,
                P::UsersExport,
                P::ResumesView,
                P::ResumesCreate,
                P::ResumesEdit,
                P::ResumesDelete,
                P::ResumesExport,
                P::ResumesImport,
                P::SettingsView,
                P::LogsView,
                P::ExportAll,
                P::ImportAll,
            ],
            Self::Moderator => vec![
                P::DashboardView,
                P::UsersView,
                P::UsersEdit,
                P::ResumesView,
                P::ResumesEdit,
            ],
            Self::Viewer => vec![P::DashboardView, P::UsersView, P::ResumesView],
        }
    }

    /// Resolve a built-in role from its code or label, ignoring case.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for BuiltinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_is_lowercase_code() {
        for role in BuiltinRole::ALL {
            assert_eq!(role.label(), role.code().to_lowercase());
        }
    }

    #[test]
    fn test_exactly_one_default() {
        let defaults: Vec<_> = BuiltinRole::ALL
            .into_iter()
            .filter(|r| r.is_default())
            .collect();
        assert_eq!(defaults, vec![BuiltinRole::Viewer]);
    }

    #[test]
    fn test_super_admin_has_everything() {
        assert_eq!(
            BuiltinRole::SuperAdmin.permissions().len(),
            Permission::ALL.len()
        );
    }

    #[test]
    fn test_admin_cannot_manage_admins() {
        let perms = BuiltinRole::Admin.permissions();
        assert!(perms.iter().all(|p| p.resource() != "admins"));
        assert!(!perms.contains(&Permission::SettingsSystem));
        assert!(!perms.contains(&Permission::LogsClear));
    }

    #[test]
    fn test_moderator_cannot_delete() {
        let perms = BuiltinRole::Moderator.permissions();
        assert!(perms.contains(&Permission::ResumesEdit));
        assert!(!perms.contains(&Permission::ResumesDelete));
        assert!(!perms.contains(&Permission::UsersDelete));
    }

    #[test]
    fn test_viewer_is_read_only() {
        for p in BuiltinRole::Viewer.permissions() {
            assert!(p.as_str().ends_with(".view"), "{p} is not a view permission");
        }
    }

    #[test]
    fn test_from_code() {
        assert_eq!(BuiltinRole::from_code("MODERATOR"), Some(BuiltinRole::Moderator));
        assert_eq!(BuiltinRole::from_code("super_admin"), Some(BuiltinRole::SuperAdmin));
        assert_eq!(BuiltinRole::from_code("owner"), None);
    }
}
