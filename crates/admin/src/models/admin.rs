//! Admin account domain types.
//!
//! [`AdminRecord`] is what the store holds, secrets included. [`Admin`] is
//! the sanitized view every service returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::{AdminId, BuiltinRole, Email, Permission};

/// An admin account as callers see it. Never carries secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: AdminId,
    pub email: Email,
    pub name: String,
    /// Lowercase role label (`super_admin`, `admin`, ...).
    pub role: String,
    /// Permission snapshot copied from the role at creation or role change.
    pub permissions: Vec<Permission>,
    pub is_active: bool,
    pub two_factor_enabled: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_by: Option<AdminId>,
    pub updated_by: Option<AdminId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    /// Whether this account holds the `super_admin` role.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role == BuiltinRole::SuperAdmin.label()
    }

    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// An admin account with its stored secrets.
///
/// Implements `Debug` manually to redact hashes and the 2FA secret.
#[derive(Clone)]
pub struct AdminRecord {
    pub admin: Admin,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Base32 TOTP secret. Present while 2FA is pending or enabled.
    pub two_factor_secret: Option<String>,
    /// SHA-256 digests of unused backup codes.
    pub backup_code_hashes: Vec<String>,
    /// SHA-256 digest of the outstanding reset token.
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
}

impl AdminRecord {
    #[must_use]
    pub fn into_admin(self) -> Admin {
        self.admin
    }

    /// A 2FA secret has been generated but not yet confirmed.
    #[must_use]
    pub const fn two_factor_pending(&self) -> bool {
        self.two_factor_secret.is_some() && !self.admin.two_factor_enabled
    }
}

impl std::fmt::Debug for AdminRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminRecord")
            .field("admin", &self.admin)
            .field("password_hash", &"[REDACTED]")
            .field(
                "two_factor_secret",
                &self.two_factor_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("backup_codes", &self.backup_code_hashes.len())
            .field(
                "reset_token_hash",
                &self.reset_token_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .field("reset_token_expires_at", &self.reset_token_expires_at)
            .finish()
    }
}

/// A validated account ready to insert.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: Email,
    pub name: String,
    pub password_hash: String,
    pub role: String,
    pub permissions: Vec<Permission>,
    pub is_active: bool,
    pub created_by: Option<AdminId>,
}

/// Store-level partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AdminPatch {
    pub email: Option<Email>,
    pub name: Option<String>,
    /// New role label and the permission snapshot that goes with it.
    pub role: Option<(String, Vec<Permission>)>,
    /// New password hash. Also stamps `password_changed_at`.
    pub password_hash: Option<String>,
    pub updated_by: Option<AdminId>,
}

impl AdminPatch {
    /// Whether applying this patch moves the account off `super_admin`.
    #[must_use]
    pub fn demotes(&self, current: &Admin) -> bool {
        current.is_super_admin()
            && self
                .role
                .as_ref()
                .is_some_and(|(label, _)| label != BuiltinRole::SuperAdmin.label())
    }
}

/// Changes to a 2FA configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwoFactorUpdate {
    /// Store a fresh secret without enabling it. Clears backup codes.
    Pending { secret: String },
    /// Enable the pending secret and store backup code digests.
    Enabled { backup_code_hashes: Vec<String> },
    /// Clear secret, flag and backup codes.
    Disabled,
}

/// Request body for creating an admin.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Role label or code. The default role is used when absent.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl std::fmt::Debug for CreateAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateAdmin")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Request body for updating an admin. Absent fields are left unchanged.
///
/// The active flag is changed through the status endpoint only.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminChanges {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminChanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminChanges")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Filters for listing admins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminFilter {
    /// Exact role label.
    pub role: Option<String>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring matched against name or email.
    pub search: Option<String>,
}

impl AdminFilter {
    /// Whether `admin` passes every set filter.
    #[must_use]
    pub fn matches(&self, admin: &Admin) -> bool {
        if let Some(role) = &self.role
            && &admin.role != role
        {
            return false;
        }
        if let Some(is_active) = self.is_active
            && admin.is_active != is_active
        {
            return false;
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            return admin.name.to_lowercase().contains(&needle)
                || admin.email.as_str().contains(&needle);
        }
        true
    }
}

/// One page of admins.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPage {
    pub items: Vec<Admin>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

/// Raw per-role counts as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCount {
    pub role: String,
    pub active: i64,
    pub inactive: i64,
}

/// Account counts for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStats {
    pub role: String,
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Account counts grouped by role, plus grand totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub by_role: Vec<RoleStats>,
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

impl From<Vec<RoleCount>> for AdminStats {
    fn from(counts: Vec<RoleCount>) -> Self {
        let by_role: Vec<RoleStats> = counts
            .into_iter()
            .map(|c| RoleStats {
                role: c.role,
                total: c.active + c.inactive,
                active: c.active,
                inactive: c.inactive,
            })
            .collect();

        let active = by_role.iter().map(|r| r.active).sum();
        let inactive = by_role.iter().map(|r| r.inactive).sum();

        Self {
            by_role,
            total: active + inactive,
            active,
            inactive,
        }
    }
}
