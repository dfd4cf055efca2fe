//! Admin account management error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::password::PasswordError;

/// Errors from creating, editing and removing admin accounts.
#[derive(Debug, Error)]
pub enum AdminServiceError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] folio_core::EmailError),

    /// Display name is blank.
    #[error("name is required")]
    MissingName,

    /// Password rejected by policy.
    #[error("{0}")]
    WeakPassword(String),

    /// Another account already uses this email.
    #[error("an admin with this email already exists")]
    DuplicateEmail,

    /// Role label does not resolve to an active role.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Acting admin may not make this change.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Target account does not exist.
    #[error("admin not found")]
    NotFound,

    /// An admin tried to delete their own account.
    #[error("you cannot delete your own account")]
    SelfDeletion,

    /// The change would leave no (active) super admin.
    #[error("cannot remove the last super admin")]
    LastSuperAdmin,

    /// Hashing the new password failed.
    #[error("password hashing error: {0}")]
    PasswordHash(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PasswordError> for AdminServiceError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => Self::WeakPassword(err.to_string()),
            PasswordError::Hash | PasswordError::Task(_) => Self::PasswordHash(err.to_string()),
        }
    }
}

/// Unique violations on the account table can only come from the email.
pub(super) fn email_conflict(err: RepositoryError) -> AdminServiceError {
    match err {
        RepositoryError::Conflict(_) => AdminServiceError::DuplicateEmail,
        other => AdminServiceError::Repository(other),
    }
}
