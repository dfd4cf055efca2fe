//! Role commands.
//!
//! ```bash
//! folio-cli roles seed
//! folio-cli roles list
//! ```

use std::sync::Arc;

use folio_admin::db::PgStore;

use super::{CliError, connect, role_service};

/// Insert missing built-in roles. Existing roles are left untouched.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn seed() -> Result<(), CliError> {
    let store = Arc::new(PgStore::new(connect().await?));

    let created = role_service(&store).initialize_default_roles().await?;
    tracing::info!(created, "Default roles seeded");
    Ok(())
}

/// Log every role with its permission list.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), CliError> {
    let store = Arc::new(PgStore::new(connect().await?));

    for role in role_service(&store).list_roles().await? {
        let permissions: Vec<&str> = role.permissions.iter().map(|p| p.as_str()).collect();
        tracing::info!(
            "{} ({}): {}",
            role.code,
            role.name,
            permissions.join(", ")
        );
    }
    Ok(())
}
