//! Authentication API handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use folio_core::AdminId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Admin, ClientInfo, CurrentAdmin};
use crate::services::LoginOutcome;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify-2fa", post(verify_2fa))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password/{token}", post(reset_password))
        .route("/api/auth/me", get(me))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/auth/2fa/setup", post(setup_2fa))
        .route("/api/auth/2fa/enable", post(enable_2fa))
        .route("/api/auth/2fa/disable", post(disable_2fa))
}

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Either a session or a 2FA challenge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(rename = "requires2FA")]
    pub requires_2fa: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<AdminId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<Admin>,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::TwoFactorRequired {
                admin_id,
                temp_token,
            } => Self {
                requires_2fa: true,
                admin_id: Some(admin_id),
                temp_token: Some(temp_token),
                token: None,
                admin: None,
            },
            LoginOutcome::Authenticated { admin, token } => Self {
                requires_2fa: false,
                admin_id: None,
                temp_token: None,
                token: Some(token),
                admin: Some(*admin),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTwoFactorRequest {
    pub admin_id: AdminId,
    pub code: String,
    pub temp_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub admin: Admin,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetupResponse {
    pub secret: String,
    pub otpauth_url: String,
    pub qr_code: String,
}

#[derive(Deserialize)]
pub struct TwoFactorCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCodesResponse {
    pub backup_codes: Vec<String>,
}

#[derive(Deserialize)]
pub struct PasswordConfirmRequest {
    pub password: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Password login. Returns a session, or a challenge when 2FA is on.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let outcome = state
        .auth()
        .login(&body.email, &body.password, &client)
        .await?;
    Ok(Json(outcome.into()))
}

/// Exchange a challenge token and code for a session.
#[tracing::instrument(skip_all, fields(admin_id = %body.admin_id))]
pub async fn verify_2fa(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<VerifyTwoFactorRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .auth()
        .verify_2fa(body.admin_id, &body.code, &body.temp_token, &client)
        .await?;
    Ok(Json(SessionResponse {
        token: session.token,
        admin: session.admin,
    }))
}

#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.auth().forgot_password(&body.email).await?;
    Ok(MessageResponse::new(message))
}

#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth().reset_password(&token, &body.password).await?;
    Ok(MessageResponse::new("Password has been reset"))
}

/// The admin behind the session token.
pub async fn me(RequireAdmin(admin): RequireAdmin) -> Json<CurrentAdmin> {
    Json(admin)
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn change_password(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>, AppError> {
    let token = state
        .auth()
        .change_password(admin.id, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(ChangePasswordResponse {
        message: "Password changed".to_string(),
        token,
    }))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn setup_2fa(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<TwoFactorSetupResponse>, AppError> {
    let enrollment = state.auth().setup_2fa(admin.id).await?;
    Ok(Json(TwoFactorSetupResponse {
        secret: enrollment.secret,
        otpauth_url: enrollment.otpauth_url,
        qr_code: enrollment.qr_code,
    }))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn enable_2fa(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<TwoFactorCodeRequest>,
) -> Result<Json<BackupCodesResponse>, AppError> {
    let backup_codes = state.auth().enable_2fa(admin.id, &body.code).await?;
    Ok(Json(BackupCodesResponse { backup_codes }))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn disable_2fa(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<PasswordConfirmRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth().disable_2fa(admin.id, &body.password).await?;
    Ok(MessageResponse::new("Two-factor authentication disabled"))
}
