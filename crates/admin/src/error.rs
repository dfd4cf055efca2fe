//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AdminServiceError, AuthError};

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Account management operation failed.
    #[error(transparent)]
    Admins(#[from] AdminServiceError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::InvalidTwoFactorCode
                | AuthError::InvalidToken
                | AuthError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
                AuthError::AccountDeactivated => StatusCode::FORBIDDEN,
                AuthError::NotFound => StatusCode::NOT_FOUND,
                AuthError::InvalidPassword
                | AuthError::WeakPassword(_)
                | AuthError::TwoFactorNotInitiated
                | AuthError::TwoFactorAlreadyEnabled => StatusCode::BAD_REQUEST,
                AuthError::PasswordHash(_)
                | AuthError::Token(_)
                | AuthError::Totp(_)
                | AuthError::Email(_)
                | AuthError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Admins(err) => match err {
                AdminServiceError::InvalidEmail(_)
                | AdminServiceError::MissingName
                | AdminServiceError::WeakPassword(_)
                | AdminServiceError::InvalidRole(_)
                | AdminServiceError::SelfDeletion => StatusCode::BAD_REQUEST,
                AdminServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                AdminServiceError::NotFound => StatusCode::NOT_FOUND,
                AdminServiceError::DuplicateEmail | AdminServiceError::LastSuperAdmin => {
                    StatusCode::CONFLICT
                }
                AdminServiceError::PasswordHash(_) | AdminServiceError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry; don't expose details to clients
        let message = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Set the Sentry user context from an admin ID.
pub fn set_sentry_user(admin_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Forbidden("admins:write".to_string());
        assert_eq!(err.to_string(), "Forbidden: admins:write");

        let err = AppError::from(AuthError::InvalidCredentials);
        assert_eq!(err.to_string(), "invalid email or password");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (AppError::from(AuthError::InvalidToken), StatusCode::UNAUTHORIZED),
            (AppError::from(AuthError::AccountDeactivated), StatusCode::FORBIDDEN),
            (AppError::from(AuthError::WeakPassword("short".into())), StatusCode::BAD_REQUEST),
            (AppError::from(AdminServiceError::DuplicateEmail), StatusCode::CONFLICT),
            (AppError::from(AdminServiceError::LastSuperAdmin), StatusCode::CONFLICT),
            (AppError::from(AdminServiceError::SelfDeletion), StatusCode::BAD_REQUEST),
            (AppError::from(AdminServiceError::Forbidden("no")), StatusCode::FORBIDDEN),
            (AppError::from(AdminServiceError::NotFound), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("missing token".into()), StatusCode::UNAUTHORIZED),
            (
                AppError::Database(RepositoryError::DataCorruption("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let (status, body) = body_json(AdminServiceError::DuplicateEmail.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "an admin with this email already exists");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row 7".into()));
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
