//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! folio-cli migrate
//! ```
//!
//! Migrations live in `crates/admin/migrations/`.

use super::{CliError, connect};

/// Run admin database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn admin() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running admin migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Admin migrations complete!");
    Ok(())
}
