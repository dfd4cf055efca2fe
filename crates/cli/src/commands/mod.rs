//! CLI subcommands.
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for the admin database

pub mod admin;
pub mod migrate;
pub mod roles;

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use folio_admin::db::{self, PgStore, RepositoryError};
use folio_admin::services::{AdminServiceError, RoleService};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Admin(#[from] AdminServiceError),
}

/// Connect to the admin database named by `ADMIN_DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("ADMIN_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Role service backed by the admin database.
pub fn role_service(store: &Arc<PgStore>) -> RoleService {
    RoleService::new(store.clone())
}
