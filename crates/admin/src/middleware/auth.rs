//! Authentication extractors for admin.
//!
//! Sessions are bearer JWTs. Every protected request re-checks the account
//! through `AuthService::authenticate`, so a deactivated account or a
//! password change locks out existing tokens immediately.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};

use folio_core::Permission;

use crate::error::{AppError, set_sentry_user};
use crate::models::{ClientInfo, CurrentAdmin};
use crate::state::AppState;

/// Extractor that requires a valid session token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(admin: RequireAdmin) -> Result<impl IntoResponse, AppError> {
///     admin.require(Permission::AdminsView)?;
///     Ok(format!("Hello, {}!", admin.0.name))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentAdmin);

impl RequireAdmin {
    /// Fail with 403 unless the admin holds `permission`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the permission is missing.
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.0.has_permission(permission) {
            return Ok(());
        }
        tracing::info!(admin_id = %self.0.id, %permission, "Permission denied");
        Err(AppError::Forbidden(format!("missing permission {permission}")))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let admin = state.auth().authenticate(token).await?;
        set_sentry_user(admin.id.as_i32(), Some(admin.email.as_str()));

        Ok(Self(CurrentAdmin::from(admin)))
    }
}

/// The token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = forwarded_for(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(Self { ip, user_agent })
    }
}

/// First hop of `X-Forwarded-For`.
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
}
