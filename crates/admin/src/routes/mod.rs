//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                           - Liveness
//! GET    /health/ready                     - Store readiness
//!
//! # Auth (public)
//! POST   /api/auth/login                   - Password login
//! POST   /api/auth/verify-2fa              - Exchange challenge token + code for a session
//! POST   /api/auth/forgot-password         - Email a reset link
//! POST   /api/auth/reset-password/{token}  - Set a new password
//!
//! # Auth (session)
//! GET    /api/auth/me                      - Current admin
//! POST   /api/auth/change-password         - Change password
//! POST   /api/auth/2fa/setup               - Start TOTP enrollment
//! POST   /api/auth/2fa/enable              - Confirm TOTP, get backup codes
//! POST   /api/auth/2fa/disable             - Turn 2FA off
//!
//! # Admin accounts (permission-gated)
//! GET    /api/admins                       - admins.view
//! POST   /api/admins                       - admins.create
//! GET    /api/admins/stats                 - admins.view
//! GET    /api/admins/{id}                  - admins.view
//! PUT    /api/admins/{id}                  - admins.edit
//! DELETE /api/admins/{id}                  - admins.delete
//! PATCH  /api/admins/{id}/status           - admins.edit
//!
//! # Roles
//! GET    /api/roles                        - admins.roles
//! ```

pub mod admins;
pub mod auth;
pub mod roles;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Build the complete application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(admins::router())
        .merge(roles::router())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
