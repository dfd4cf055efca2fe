//! Audit log entries.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::{ActionLogId, AdminId};

/// What happened. Stored as the snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LoginSuccess,
    LoginFailed,
    TwoFactorSuccess,
    TwoFactorFailed,
    TwoFactorEnabled,
    TwoFactorDisabled,
    PasswordResetRequested,
    PasswordReset,
    PasswordChanged,
    AdminCreated,
    AdminUpdated,
    AdminDeleted,
    AdminStatusChanged,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailed => "login_failed",
            Self::TwoFactorSuccess => "two_factor_success",
            Self::TwoFactorFailed => "two_factor_failed",
            Self::TwoFactorEnabled => "two_factor_enabled",
            Self::TwoFactorDisabled => "two_factor_disabled",
            Self::PasswordResetRequested => "password_reset_requested",
            Self::PasswordReset => "password_reset",
            Self::PasswordChanged => "password_changed",
            Self::AdminCreated => "admin_created",
            Self::AdminUpdated => "admin_updated",
            Self::AdminDeleted => "admin_deleted",
            Self::AdminStatusChanged => "admin_status_changed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub id: ActionLogId,
    /// `None` for attempts against unknown emails.
    pub admin_id: Option<AdminId>,
    pub action: AuditAction,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
