//! Admin authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;
use crate::services::password::PasswordError;

use super::totp::TotpError;

/// Errors that can occur during admin authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Account exists but has been deactivated.
    #[error("account is deactivated")]
    AccountDeactivated,

    /// TOTP or backup code did not match.
    #[error("invalid two-factor code")]
    InvalidTwoFactorCode,

    /// Session or challenge token failed verification.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Reset token unknown, already used or expired.
    #[error("invalid or expired reset token")]
    InvalidOrExpiredToken,

    /// Password re-confirmation failed.
    #[error("current password is incorrect")]
    InvalidPassword,

    /// New password rejected by policy.
    #[error("{0}")]
    WeakPassword(String),

    /// Admin account not found.
    #[error("admin not found")]
    NotFound,

    /// `enable_2fa` called before `setup_2fa`.
    #[error("two-factor setup has not been started")]
    TwoFactorNotInitiated,

    /// `setup_2fa` called while 2FA is already on.
    #[error("two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,

    /// Hashing or verifying a password failed.
    #[error("password hashing error: {0}")]
    PasswordHash(String),

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// TOTP generator error.
    #[error("TOTP error: {0}")]
    Totp(#[from] TotpError),

    /// Email delivery error.
    #[error("email error: {0}")]
    Email(#[from] EmailError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => Self::WeakPassword(err.to_string()),
            PasswordError::Hash | PasswordError::Task(_) => Self::PasswordHash(err.to_string()),
        }
    }
}
