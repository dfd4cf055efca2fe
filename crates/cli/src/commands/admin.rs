//! Admin account commands.
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap the first super admin
//! FOLIO_ADMIN_PASSWORD=... folio-cli admin create -e admin@example.com -n "Admin Name" -r super_admin
//! ```
//!
//! Built-in roles are seeded first so the requested role resolves on a
//! fresh database. The account goes through the same validation as the API
//! and the creation is written to the action log with no actor.

use std::sync::Arc;

use folio_admin::db::PgStore;
use folio_admin::models::CreateAdmin;
use folio_admin::services::AdminService;

use super::{CliError, connect, role_service};

/// Create a new admin account.
///
/// # Errors
///
/// Returns an error if the email, name, password or role is rejected, the
/// email is taken, or the database is unreachable.
pub async fn create(
    email: String,
    name: String,
    role: String,
    password: String,
) -> Result<(), CliError> {
    let store = Arc::new(PgStore::new(connect().await?));
    let roles = role_service(&store);
    roles.initialize_default_roles().await?;

    let admins = AdminService::new(store.clone(), store, roles);

    tracing::info!("Creating admin: {} ({})", email, role);
    let admin = admins
        .create_admin(
            CreateAdmin {
                email,
                password,
                name,
                role: Some(role),
                is_active: Some(true),
            },
            None,
        )
        .await?;

    tracing::info!(
        "Admin created successfully! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );
    Ok(())
}
