//! Credential store for admin `PostgreSQL`.
//!
//! # Schema: `admin`
//!
//! ## Tables
//!
//! - `admin_account` - Admin identities, password hashes, 2FA state, reset tokens
//! - `role` - Named permission sets (four built-in roles are seeded at startup)
//! - `action_log` - Audit trail for authentication and account management events
//!
//! # Store traits
//!
//! Services depend on [`AdminStore`], [`RoleStore`] and [`ActionLogStore`]
//! rather than on the pool directly. [`PgStore`] implements all three against
//! `PostgreSQL`; [`MemoryStore`] implements them in-process for tests and
//! local runs.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p folio-cli -- migrate
//! ```

pub mod action_log;
pub mod admins;
pub mod memory;
pub mod roles;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use folio_core::{AdminId, Email};

use crate::models::{
    Admin, AdminFilter, AdminPatch, AdminRecord, AuditAction, NewAdmin, NewRole, Role, RoleCount,
    TwoFactorUpdate,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Result of a write that is refused when it would leave no super admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    /// The write was applied.
    Applied(T),
    /// The target account does not exist.
    NotFound,
    /// The write would remove the last (active) super admin.
    LastSuperAdmin,
}

/// Persistence for admin accounts.
///
/// Every method that could reduce the number of super admins takes the check
/// and the write as one atomic step and reports the result as a
/// [`GuardOutcome`].
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn find_admin_by_id(&self, id: AdminId) -> Result<Option<AdminRecord>, RepositoryError>;

    async fn find_admin_by_email(&self, email: &Email)
    -> Result<Option<AdminRecord>, RepositoryError>;

    /// Insert a new account.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, RepositoryError>;

    /// Apply a partial update.
    ///
    /// Demoting the last active super admin yields `LastSuperAdmin`. An email
    /// already held by another account yields `RepositoryError::Conflict`.
    async fn update_admin(
        &self,
        id: AdminId,
        patch: AdminPatch,
    ) -> Result<GuardOutcome<Admin>, RepositoryError>;

    /// Page through accounts matching `filter`, newest first.
    ///
    /// Returns the page and the total number of matches.
    async fn list_admins(
        &self,
        filter: &AdminFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Admin>, i64), RepositoryError>;

    /// Delete an account unless it is the only super admin, active or not.
    async fn delete_admin(&self, id: AdminId) -> Result<GuardOutcome<()>, RepositoryError>;

    /// Set the active flag unless that deactivates the last active super admin.
    async fn set_admin_active(
        &self,
        id: AdminId,
        is_active: bool,
        updated_by: Option<AdminId>,
    ) -> Result<GuardOutcome<Admin>, RepositoryError>;

    /// Active/inactive account counts per role label.
    async fn role_counts(&self) -> Result<Vec<RoleCount>, RepositoryError>;

    async fn record_login(
        &self,
        id: AdminId,
        at: DateTime<Utc>,
        ip: Option<&str>,
    ) -> Result<(), RepositoryError>;

    async fn set_two_factor(
        &self,
        id: AdminId,
        update: TwoFactorUpdate,
    ) -> Result<(), RepositoryError>;

    /// Remove a backup code digest. Returns whether it was present.
    async fn consume_backup_code(
        &self,
        id: AdminId,
        code_hash: &str,
    ) -> Result<bool, RepositoryError>;

    /// Store a reset token digest, replacing any previous one.
    async fn set_reset_token(
        &self,
        id: AdminId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Consume an unexpired reset token and set the new password in one step.
    ///
    /// Returns `None` if no account holds that digest or it has expired; the
    /// password is left untouched in that case.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Admin>, RepositoryError>;

    /// Replace the password hash and stamp `password_changed_at`.
    async fn set_password(
        &self,
        id: AdminId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Persistence for roles.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role_by_code(&self, code: &str) -> Result<Option<Role>, RepositoryError>;

    /// Insert a role. Returns `RepositoryError::Conflict` on a duplicate code or name.
    async fn insert_role(&self, role: NewRole) -> Result<Role, RepositoryError>;

    /// All roles ordered by code.
    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError>;

    async fn find_default_role(&self) -> Result<Option<Role>, RepositoryError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait ActionLogStore: Send + Sync {
    async fn create_action_log(
        &self,
        actor: Option<AdminId>,
        action: AuditAction,
        metadata: serde_json::Value,
    ) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
