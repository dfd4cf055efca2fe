//! Admin authentication service.
//!
//! Password login with optional TOTP second factor, password reset by email,
//! and stateless JWT sessions.
//!
//! # Login flow
//!
//! 1. `login` checks email and password.
//! 2. Without 2FA a session token is returned straight away.
//! 3. With 2FA a five minute challenge token is returned instead, and
//!    `verify_2fa` exchanges it plus a TOTP or backup code for a session.
//!
//! Sessions are never stored. `authenticate` re-reads the account on every
//! request so deactivation and password changes take effect immediately.

mod codes;
mod error;
mod token;
mod totp;

pub use codes::{BACKUP_CODE_COUNT, backup_code_hash, generate_backup_codes, sha256_hex};
pub use error::AuthError;
pub use token::{
    CHALLENGE_TOKEN_TTL_SECS, CHALLENGE_TOKEN_TYPE, ChallengeClaims, SessionClaims, TokenIssuer,
};
pub use totp::{TotpEnrollment, TotpError, TotpFactory};

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use folio_core::{AdminId, Email};

use crate::db::{ActionLogStore, AdminStore};
use crate::models::{Admin, AdminRecord, AuditAction, ClientInfo, TwoFactorUpdate};
use crate::services::email::Mailer;
use crate::services::password::{hash_password, validate_password, verify_password};

/// Returned by `forgot_password` whether or not the account exists.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";

/// Signing, TOTP and reset-link settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub tokens: TokenIssuer,
    pub totp: TotpFactory,
    /// Base URL of the admin portal, without trailing slash.
    pub portal_url: String,
    pub reset_token_ttl: Duration,
}

/// Result of a password login.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Password accepted; a second factor is needed.
    TwoFactorRequired {
        admin_id: AdminId,
        temp_token: String,
    },
    /// Fully authenticated.
    Authenticated { admin: Box<Admin>, token: String },
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub admin: Admin,
    pub token: String,
}

/// Admin authentication service.
#[derive(Clone)]
pub struct AuthService {
    admins: Arc<dyn AdminStore>,
    logs: Arc<dyn ActionLogStore>,
    mailer: Arc<dyn Mailer>,
    settings: AuthSettings,
}

impl AuthService {
    #[must_use]
    pub fn new(
        admins: Arc<dyn AdminStore>,
        logs: Arc<dyn ActionLogStore>,
        mailer: Arc<dyn Mailer>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            admins,
            logs,
            mailer,
            settings,
        }
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.settings.tokens
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Verify email and password.
    ///
    /// Unknown email and wrong password both yield
    /// `AuthError::InvalidCredentials`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials`, `AccountDeactivated`, or an
    /// infrastructure error.
    #[tracing::instrument(skip(self, password, client), fields(ip = ?client.ip))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<LoginOutcome, AuthError> {
        let record = match Email::parse(email) {
            Ok(email) => self.admins.find_admin_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(record) = record else {
            tracing::info!("Login failed: unknown email");
            self.audit(
                None,
                AuditAction::LoginFailed,
                with_client(client, json!({ "email": email, "reason": "unknown_email" })),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        };
        let admin_id = record.admin.id;

        if !record.admin.is_active {
            tracing::info!(%admin_id, "Login failed: account deactivated");
            self.audit(
                Some(admin_id),
                AuditAction::LoginFailed,
                with_client(client, json!({ "reason": "account_deactivated" })),
            )
            .await;
            return Err(AuthError::AccountDeactivated);
        }

        if !verify_password(password, &record.password_hash).await? {
            tracing::info!(%admin_id, "Login failed: wrong password");
            self.audit(
                Some(admin_id),
                AuditAction::LoginFailed,
                with_client(client, json!({ "reason": "invalid_password" })),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        if record.admin.two_factor_enabled {
            tracing::info!(%admin_id, "Password accepted, 2FA required");
            return Ok(LoginOutcome::TwoFactorRequired {
                admin_id,
                temp_token: self.generate_temp_token(admin_id)?,
            });
        }

        let session = self.start_session(record.admin, client).await?;
        self.audit(Some(admin_id), AuditAction::LoginSuccess, client.metadata())
            .await;
        tracing::info!(%admin_id, "Login succeeded");

        Ok(LoginOutcome::Authenticated {
            admin: Box::new(session.admin),
            token: session.token,
        })
    }

    /// Exchange a challenge token and a TOTP or backup code for a session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the challenge token is bad, expired or for
    /// another admin, and `InvalidTwoFactorCode` if the code does not match.
    #[tracing::instrument(skip(self, code, temp_token, client), fields(ip = ?client.ip))]
    pub async fn verify_2fa(
        &self,
        admin_id: AdminId,
        code: &str,
        temp_token: &str,
        client: &ClientInfo,
    ) -> Result<Session, AuthError> {
        let challenge = self.tokens().verify_challenge(temp_token, admin_id);
        if !matches!(challenge, Ok(Some(_))) {
            return Err(self
                .two_factor_rejected(admin_id, client, "invalid_token", AuthError::InvalidToken)
                .await);
        }

        let Some(record) = self.admins.find_admin_by_id(admin_id).await? else {
            return Err(self
                .two_factor_rejected(admin_id, client, "unknown_admin", AuthError::InvalidToken)
                .await);
        };
        if !record.admin.is_active {
            return Err(self
                .two_factor_rejected(
                    admin_id,
                    client,
                    "account_deactivated",
                    AuthError::AccountDeactivated,
                )
                .await);
        }
        let Some(secret) = record
            .two_factor_secret
            .as_deref()
            .filter(|_| record.admin.two_factor_enabled)
        else {
            return Err(self
                .two_factor_rejected(
                    admin_id,
                    client,
                    "two_factor_not_enabled",
                    AuthError::InvalidToken,
                )
                .await);
        };

        let method = if self.settings.totp.verify(secret, code)? {
            "totp"
        } else if self.consume_backup_code(admin_id, code).await? {
            "backup_code"
        } else {
            return Err(self
                .two_factor_rejected(
                    admin_id,
                    client,
                    "invalid_code",
                    AuthError::InvalidTwoFactorCode,
                )
                .await);
        };

        let session = self.start_session(record.admin, client).await?;
        self.audit(
            Some(admin_id),
            AuditAction::TwoFactorSuccess,
            with_client(client, json!({ "method": method })),
        )
        .await;
        tracing::info!(%admin_id, method, "2FA verification succeeded");

        Ok(session)
    }

    /// Record a failed second step and hand back the error to return.
    async fn two_factor_rejected(
        &self,
        admin_id: AdminId,
        client: &ClientInfo,
        reason: &'static str,
        err: AuthError,
    ) -> AuthError {
        tracing::info!(%admin_id, reason, "2FA verification failed");
        self.audit(
            Some(admin_id),
            AuditAction::TwoFactorFailed,
            with_client(client, json!({ "reason": reason })),
        )
        .await;
        err
    }

    async fn consume_backup_code(&self, admin_id: AdminId, code: &str) -> Result<bool, AuthError> {
        let Some(hash) = backup_code_hash(code) else {
            return Ok(false);
        };
        let used = self.admins.consume_backup_code(admin_id, &hash).await?;
        if used {
            tracing::warn!(%admin_id, "Backup code used");
        }
        Ok(used)
    }

    async fn start_session(
        &self,
        mut admin: Admin,
        client: &ClientInfo,
    ) -> Result<Session, AuthError> {
        let now = Utc::now();
        let token = self.tokens().issue_session(&admin)?;

        self.admins
            .record_login(admin.id, now, client.ip.as_deref())
            .await?;
        admin.last_login = Some(now);
        admin.last_login_ip.clone_from(&client.ip);

        Ok(Session { admin, token })
    }

    // =========================================================================
    // Two-factor management
    // =========================================================================

    /// Generate a new TOTP secret and store it as pending.
    ///
    /// Calling again before `enable_2fa` replaces the pending secret.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `TwoFactorAlreadyEnabled`, or an infrastructure
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn setup_2fa(&self, admin_id: AdminId) -> Result<TotpEnrollment, AuthError> {
        let record = self.load(admin_id).await?;
        if record.admin.two_factor_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let enrollment = self.settings.totp.generate(record.admin.email.as_str())?;
        self.admins
            .set_two_factor(
                admin_id,
                TwoFactorUpdate::Pending {
                    secret: enrollment.secret.clone(),
                },
            )
            .await?;

        tracing::info!(%admin_id, "2FA setup started");
        Ok(enrollment)
    }

    /// Confirm the pending secret with a code and turn 2FA on.
    ///
    /// Returns the plaintext backup codes. They are not retrievable later.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `TwoFactorAlreadyEnabled`, `TwoFactorNotInitiated`,
    /// `InvalidTwoFactorCode`, or an infrastructure error.
    #[tracing::instrument(skip(self, code))]
    pub async fn enable_2fa(&self, admin_id: AdminId, code: &str) -> Result<Vec<String>, AuthError> {
        let record = self.load(admin_id).await?;
        if record.admin.two_factor_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }
        let Some(secret) = record.two_factor_secret.as_deref() else {
            return Err(AuthError::TwoFactorNotInitiated);
        };

        if !self.settings.totp.verify(secret, code)? {
            self.audit(
                Some(admin_id),
                AuditAction::TwoFactorFailed,
                json!({ "reason": "enable_invalid_code" }),
            )
            .await;
            return Err(AuthError::InvalidTwoFactorCode);
        }

        let codes = generate_backup_codes();
        let backup_code_hashes = codes.iter().filter_map(|c| backup_code_hash(c)).collect();
        self.admins
            .set_two_factor(admin_id, TwoFactorUpdate::Enabled { backup_code_hashes })
            .await?;

        self.audit(Some(admin_id), AuditAction::TwoFactorEnabled, json!({}))
            .await;
        tracing::info!(%admin_id, "2FA enabled");
        Ok(codes)
    }

    /// Turn 2FA off after re-confirming the password.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidPassword`, or an infrastructure error.
    #[tracing::instrument(skip(self, password))]
    pub async fn disable_2fa(&self, admin_id: AdminId, password: &str) -> Result<(), AuthError> {
        let record = self.load(admin_id).await?;
        if !verify_password(password, &record.password_hash).await? {
            return Err(AuthError::InvalidPassword);
        }

        self.admins
            .set_two_factor(admin_id, TwoFactorUpdate::Disabled)
            .await?;

        self.audit(Some(admin_id), AuditAction::TwoFactorDisabled, json!({}))
            .await;
        tracing::info!(%admin_id, "2FA disabled");
        Ok(())
    }

    // =========================================================================
    // Passwords
    // =========================================================================

    /// Email a reset link if the account exists.
    ///
    /// Returns [`FORGOT_PASSWORD_MESSAGE`] for unknown addresses too.
    ///
    /// # Errors
    ///
    /// Returns `AccountDeactivated` for an inactive account, `Email` if the
    /// link could not be sent, or a repository error.
    #[tracing::instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<&'static str, AuthError> {
        let record = match Email::parse(email) {
            Ok(email) => self.admins.find_admin_by_email(&email).await?,
            Err(_) => None,
        };
        let Some(record) = record else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(FORGOT_PASSWORD_MESSAGE);
        };
        let admin = record.admin;

        if !admin.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let token = codes::generate_reset_token();
        let expires_at = Utc::now() + self.settings.reset_token_ttl;
        self.admins
            .set_reset_token(admin.id, &sha256_hex(&token), expires_at)
            .await?;

        self.audit(
            Some(admin.id),
            AuditAction::PasswordResetRequested,
            json!({ "expiresAt": expires_at }),
        )
        .await;

        let reset_url = format!(
            "{}/reset-password/{token}",
            self.settings.portal_url.trim_end_matches('/')
        );
        self.mailer
            .send_password_reset_email(&admin.email, &admin.name, &reset_url)
            .await?;

        tracing::info!(admin_id = %admin.id, "Password reset email sent");
        Ok(FORGOT_PASSWORD_MESSAGE)
    }

    /// Set a new password using an emailed reset token.
    ///
    /// # Errors
    ///
    /// Returns `WeakPassword`, `InvalidOrExpiredToken`, or an infrastructure
    /// error. The password is unchanged on any error.
    #[tracing::instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let password_hash = hash_password(new_password).await?;

        let admin = self
            .admins
            .consume_reset_token(&sha256_hex(token.trim()), &password_hash, Utc::now())
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        self.audit(Some(admin.id), AuditAction::PasswordReset, json!({}))
            .await;
        tracing::info!(admin_id = %admin.id, "Password reset");

        self.notify_password_changed(&admin).await;
        Ok(())
    }

    /// Change the password after verifying the current one.
    ///
    /// Earlier session tokens stop working. Returns a fresh session token so
    /// the caller stays signed in.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidPassword`, `WeakPassword`, or an
    /// infrastructure error.
    #[tracing::instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        admin_id: AdminId,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, AuthError> {
        let record = self.load(admin_id).await?;
        if !verify_password(current_password, &record.password_hash).await? {
            return Err(AuthError::InvalidPassword);
        }
        validate_password(new_password)?;

        let password_hash = hash_password(new_password).await?;
        let now = Utc::now();
        self.admins
            .set_password(admin_id, &password_hash, now)
            .await?;

        self.audit(Some(admin_id), AuditAction::PasswordChanged, json!({}))
            .await;
        tracing::info!(%admin_id, "Password changed");

        let mut admin = record.admin;
        admin.password_changed_at = Some(now);
        self.notify_password_changed(&admin).await;

        Ok(self.tokens().issue_session(&admin)?)
    }

    async fn notify_password_changed(&self, admin: &Admin) {
        if let Err(e) = self
            .mailer
            .send_password_changed_email(&admin.email, &admin.name)
            .await
        {
            tracing::warn!(admin_id = %admin.id, error = %e, "Failed to send password changed email");
        }
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Sign a session token for `admin`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn generate_token(&self, admin: &Admin) -> Result<String, AuthError> {
        Ok(self.tokens().issue_session(admin)?)
    }

    /// Sign a challenge token for `admin_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn generate_temp_token(&self, admin_id: AdminId) -> Result<String, AuthError> {
        Ok(self.tokens().issue_challenge(admin_id)?)
    }

    /// Check a session token's signature and expiry without touching the store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on any verification failure.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.tokens().verify_session(token).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            AuthError::InvalidToken
        })
    }

    /// Verify a session token and load the account behind it.
    ///
    /// Rejects tokens for missing or inactive accounts and tokens issued
    /// before the last password change. `iat` is in whole seconds, so a token
    /// from the same second as the change counts as older.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the session is no longer valid.
    pub async fn authenticate(&self, token: &str) -> Result<Admin, AuthError> {
        let claims = self.verify_token(token)?;

        let Some(record) = self.admins.find_admin_by_id(claims.id).await? else {
            return Err(AuthError::InvalidToken);
        };
        let admin = record.admin;

        if !admin.is_active {
            return Err(AuthError::InvalidToken);
        }
        if let Some(changed) = admin.password_changed_at
            && claims.iat <= changed.timestamp()
        {
            tracing::debug!(admin_id = %admin.id, "Session predates password change");
            return Err(AuthError::InvalidToken);
        }

        Ok(admin)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load(&self, admin_id: AdminId) -> Result<AdminRecord, AuthError> {
        self.admins
            .find_admin_by_id(admin_id)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Write an audit entry. A failed write is logged, never surfaced.
    async fn audit(&self, actor: Option<AdminId>, action: AuditAction, metadata: serde_json::Value) {
        if let Err(e) = self.logs.create_action_log(actor, action, metadata).await {
            tracing::error!(%action, error = %e, "Failed to write audit log");
        }
    }
}

fn with_client(client: &ClientInfo, mut metadata: serde_json::Value) -> serde_json::Value {
    if let (Some(target), serde_json::Value::Object(extra)) =
        (metadata.as_object_mut(), client.metadata())
    {
        target.extend(extra);
    }
    metadata
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::test_support::{PORTAL_URL, RecordingMailer, SentEmail, auth_service, seed_admin};
    use folio_core::BuiltinRole;

    const PASSWORD: &str = "correct horse battery";

    fn client() -> ClientInfo {
        ClientInfo {
            ip: Some("203.0.113.9".to_owned()),
            user_agent: Some("test-agent".to_owned()),
        }
    }

    fn now_secs() -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap()
    }

    async fn setup() -> (MemoryStore, RecordingMailer, AuthService, Admin) {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::default();
        let auth = auth_service(&store, &mailer);
        let admin = seed_admin(&store, "jane@folio.app", PASSWORD, BuiltinRole::Admin).await;
        (store, mailer, auth, admin)
    }

    async fn enable_two_factor(store: &MemoryStore, auth: &AuthService, id: AdminId) -> Vec<String> {
        let enrollment = auth.setup_2fa(id).await.unwrap();
        assert!(store.record(id).await.unwrap().two_factor_pending());

        let code = TotpFactory::new("Folio Admin")
            .code_at(&enrollment.secret, now_secs())
            .unwrap();
        auth.enable_2fa(id, &code).await.unwrap()
    }

    #[tokio::test]
    async fn test_login_without_2fa_issues_session() {
        let (store, _, auth, admin) = setup().await;

        let outcome = auth.login("JANE@folio.app", PASSWORD, &client()).await.unwrap();
        let LoginOutcome::Authenticated { admin: logged_in, token } = outcome else {
            panic!("expected a session");
        };

        assert_eq!(logged_in.id, admin.id);
        assert_eq!(logged_in.last_login_ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(auth.verify_token(&token).unwrap().id, admin.id);

        let stored = store.record(admin.id).await.unwrap();
        assert!(stored.admin.last_login.is_some());

        let logs = store.action_logs().await;
        assert_eq!(logs.last().unwrap().action, AuditAction::LoginSuccess);
        assert_eq!(logs.last().unwrap().metadata["ip"], "203.0.113.9");
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let (store, _, auth, admin) = setup().await;

        let unknown = auth
            .login("nobody@folio.app", PASSWORD, &client())
            .await
            .unwrap_err();
        let wrong = auth
            .login("jane@folio.app", "wrong password", &client())
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());

        let logs = store.action_logs().await;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].admin_id, None);
        assert_eq!(logs[1].admin_id, Some(admin.id));
        assert!(logs.iter().all(|l| l.action == AuditAction::LoginFailed));
    }

    #[tokio::test]
    async fn test_login_deactivated_account() {
        let (store, _, auth, admin) = setup().await;
        store.set_admin_active(admin.id, false, None).await.unwrap();

        let err = auth.login("jane@folio.app", PASSWORD, &client()).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
    }

    #[tokio::test]
    async fn test_full_two_factor_flow() {
        let (store, _, auth, admin) = setup().await;
        let backup_codes = enable_two_factor(&store, &auth, admin.id).await;
        assert_eq!(backup_codes.len(), BACKUP_CODE_COUNT);

        let LoginOutcome::TwoFactorRequired {
            admin_id,
            temp_token,
        } = auth.login("jane@folio.app", PASSWORD, &client()).await.unwrap()
        else {
            panic!("expected a 2FA challenge");
        };
        assert_eq!(admin_id, admin.id);
        assert!(auth.verify_token(&temp_token).is_err());

        let secret = store.record(admin.id).await.unwrap().two_factor_secret.unwrap();
        let code = TotpFactory::new("Folio Admin")
            .code_at(&secret, now_secs())
            .unwrap();
        let session = auth
            .verify_2fa(admin_id, &code, &temp_token, &client())
            .await
            .unwrap();

        assert_eq!(auth.authenticate(&session.token).await.unwrap().id, admin.id);
        assert_eq!(
            store.action_logs().await.last().unwrap().action,
            AuditAction::TwoFactorSuccess
        );
    }

    #[tokio::test]
    async fn test_verify_2fa_rejects_bad_codes_and_tokens() {
        let (store, _, auth, admin) = setup().await;
        enable_two_factor(&store, &auth, admin.id).await;
        let temp_token = auth.generate_temp_token(admin.id).unwrap();

        let err = auth
            .verify_2fa(admin.id, "000000", &temp_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidTwoFactorCode));

        let err = auth
            .verify_2fa(AdminId::new(999), "000000", &temp_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));

        let stale = auth
            .tokens()
            .issue_challenge_at(admin.id, Utc::now() - Duration::minutes(6))
            .unwrap();
        let err = auth
            .verify_2fa(admin.id, "000000", &stale, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_verify_2fa_audits_every_rejection() {
        let (store, _, auth, admin) = setup().await;
        enable_two_factor(&store, &auth, admin.id).await;
        let LoginOutcome::TwoFactorRequired { temp_token, .. } =
            auth.login("jane@folio.app", PASSWORD, &client()).await.unwrap()
        else {
            panic!("expected a 2FA challenge");
        };
        store.set_admin_active(admin.id, false, None).await.unwrap();

        let err = auth
            .verify_2fa(admin.id, "000000", &temp_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
        let last = store.action_logs().await.pop().unwrap();
        assert_eq!(last.action, AuditAction::TwoFactorFailed);
        assert_eq!(last.admin_id, Some(admin.id));
        assert_eq!(last.metadata["reason"], "account_deactivated");
        assert_eq!(last.metadata["ip"], "203.0.113.9");

        let ghost = AdminId::new(999);
        let ghost_token = auth.generate_temp_token(ghost).unwrap();
        let err = auth
            .verify_2fa(ghost, "000000", &ghost_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
        assert_eq!(
            store.action_logs().await.pop().unwrap().metadata["reason"],
            "unknown_admin"
        );

        let plain = seed_admin(&store, "sam@folio.app", PASSWORD, BuiltinRole::Viewer).await;
        let plain_token = auth.generate_temp_token(plain.id).unwrap();
        let err = auth
            .verify_2fa(plain.id, "000000", &plain_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
        assert_eq!(
            store.action_logs().await.pop().unwrap().metadata["reason"],
            "two_factor_not_enabled"
        );
    }

    #[tokio::test]
    async fn test_backup_code_works_once() {
        let (store, _, auth, admin) = setup().await;
        let backup_codes = enable_two_factor(&store, &auth, admin.id).await;
        let temp_token = auth.generate_temp_token(admin.id).unwrap();

        auth.verify_2fa(admin.id, &backup_codes[0].to_lowercase(), &temp_token, &client())
            .await
            .unwrap();

        let err = auth
            .verify_2fa(admin.id, &backup_codes[0], &temp_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidTwoFactorCode));
        assert_eq!(
            store.record(admin.id).await.unwrap().backup_code_hashes.len(),
            BACKUP_CODE_COUNT - 1
        );
    }

    #[tokio::test]
    async fn test_enable_requires_setup() {
        let (_, _, auth, admin) = setup().await;

        let err = auth.enable_2fa(admin.id, "123456").await.unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorNotInitiated));
    }

    #[tokio::test]
    async fn test_setup_rejected_when_enabled() {
        let (store, _, auth, admin) = setup().await;
        enable_two_factor(&store, &auth, admin.id).await;

        let err = auth.setup_2fa(admin.id).await.unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorAlreadyEnabled));
    }

    #[tokio::test]
    async fn test_pending_secret_does_not_gate_login() {
        let (_, _, auth, admin) = setup().await;
        auth.setup_2fa(admin.id).await.unwrap();

        let outcome = auth.login("jane@folio.app", PASSWORD, &client()).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::Authenticated { .. }));
    }

    #[tokio::test]
    async fn test_disable_2fa_requires_password() {
        let (store, _, auth, admin) = setup().await;
        enable_two_factor(&store, &auth, admin.id).await;

        let err = auth.disable_2fa(admin.id, "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword));

        auth.disable_2fa(admin.id, PASSWORD).await.unwrap();
        let record = store.record(admin.id).await.unwrap();
        assert!(!record.admin.two_factor_enabled);
        assert!(record.two_factor_secret.is_none());
        assert!(record.backup_code_hashes.is_empty());
    }

    #[tokio::test]
    async fn test_forgot_and_reset_password() {
        let (store, mailer, auth, admin) = setup().await;

        assert_eq!(
            auth.forgot_password("nobody@folio.app").await.unwrap(),
            auth.forgot_password("jane@folio.app").await.unwrap()
        );

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let SentEmail::PasswordReset { to, reset_url } = &sent[0] else {
            panic!("expected a reset email");
        };
        assert_eq!(to, "jane@folio.app");
        let token = reset_url
            .strip_prefix(&format!("{PORTAL_URL}/reset-password/"))
            .unwrap();

        let stored = store.record(admin.id).await.unwrap();
        assert_eq!(stored.reset_token_hash.as_deref(), Some(sha256_hex(token).as_str()));

        auth.reset_password(token, "a brand new password").await.unwrap();
        assert!(auth.login("jane@folio.app", "a brand new password", &client()).await.is_ok());
        assert!(matches!(
            mailer.sent().last(),
            Some(SentEmail::PasswordChanged { .. })
        ));

        let err = auth.reset_password(token, "yet another one").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_expired_reset_token_leaves_password() {
        let (store, mailer, auth, admin) = setup().await;
        auth.forgot_password("jane@folio.app").await.unwrap();
        let SentEmail::PasswordReset { reset_url, .. } = mailer.sent().remove(0) else {
            panic!("expected a reset email");
        };
        let token = reset_url.rsplit('/').next().unwrap().to_owned();
        store
            .expire_reset_token(admin.id, Utc::now() - Duration::minutes(1))
            .await;

        let err = auth.reset_password(&token, "a brand new password").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
        assert!(auth.login("jane@folio.app", PASSWORD, &client()).await.is_ok());
    }

    #[tokio::test]
    async fn test_forgot_password_deactivated() {
        let (store, mailer, auth, admin) = setup().await;
        store.set_admin_active(admin.id, false, None).await.unwrap();

        let err = auth.forgot_password("jane@folio.app").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let (_, _, auth, admin) = setup().await;

        let err = auth.change_password(admin.id, PASSWORD, "short").await.unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));

        let err = auth.reset_password("whatever", "short").await.unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_change_password_revokes_older_sessions() {
        let (_, mailer, auth, admin) = setup().await;
        let old = auth
            .tokens()
            .issue_session_at(&admin, Utc::now() - Duration::seconds(30))
            .unwrap();
        assert!(auth.authenticate(&old).await.is_ok());

        let err = auth
            .change_password(admin.id, "wrong password", "a brand new password")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword));

        let fresh = auth
            .change_password(admin.id, PASSWORD, "a brand new password")
            .await
            .unwrap();

        assert!(matches!(
            auth.authenticate(&old).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(auth.authenticate(&fresh).await.is_ok());
        assert_eq!(
            mailer.sent(),
            vec![SentEmail::PasswordChanged {
                to: "jane@folio.app".to_owned()
            }]
        );
    }

    #[tokio::test]
    async fn test_same_second_session_revoked_by_password_change() {
        let (store, _, auth, admin) = setup().await;
        let changed = Utc::now();
        let early = auth.tokens().issue_session_at(&admin, changed).unwrap();
        store
            .set_password(admin.id, &hash_password(PASSWORD).await.unwrap(), changed)
            .await
            .unwrap();

        assert!(matches!(
            auth.authenticate(&early).await,
            Err(AuthError::InvalidToken)
        ));

        let admin = store.record(admin.id).await.unwrap().admin;
        let late = auth.generate_token(&admin).unwrap();
        assert!(auth.authenticate(&late).await.is_ok());
        assert!(auth.verify_token(&late).unwrap().iat > changed.timestamp());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_deactivated_account() {
        let (store, _, auth, admin) = setup().await;
        let token = auth.generate_token(&admin).unwrap();
        store.set_admin_active(admin.id, false, None).await.unwrap();

        assert!(matches!(
            auth.authenticate(&token).await,
            Err(AuthError::InvalidToken)
        ));
        // The stateless check still passes.
        assert!(auth.verify_token(&token).is_ok());
    }
}
