//! Role service: seeds and looks up named permission sets.

use std::sync::Arc;

use folio_core::BuiltinRole;

use crate::db::{RepositoryError, RoleStore};
use crate::models::{NewRole, Role};

/// Seeds the built-in roles and resolves role labels.
#[derive(Clone)]
pub struct RoleService {
    roles: Arc<dyn RoleStore>,
}

impl RoleService {
    #[must_use]
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }

    /// Insert any built-in role whose code is missing.
    ///
    /// Existing roles are left untouched, even if their permissions have
    /// drifted from the built-in definition. Returns the number created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a lookup or insert fails.
    pub async fn initialize_default_roles(&self) -> Result<usize, RepositoryError> {
        let mut created = 0;

        for builtin in BuiltinRole::ALL {
            if self.roles.find_role_by_code(builtin.code()).await?.is_some() {
                continue;
            }

            match self.roles.insert_role(NewRole::from(builtin)).await {
                Ok(role) => {
                    tracing::info!(code = %role.code, "Seeded role");
                    created += 1;
                }
                // Another instance seeded it between our lookup and insert.
                Err(RepositoryError::Conflict(_)) => {
                    tracing::debug!(code = builtin.code(), "Role already seeded");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(created)
    }

    /// Exact lookup on the stored uppercase code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Role>, RepositoryError> {
        self.roles.find_role_by_code(code).await
    }

    /// Resolve a role label (`super_admin`) or code (`SUPER_ADMIN`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    pub async fn resolve(&self, label: &str) -> Result<Option<Role>, RepositoryError> {
        self.find_by_code(&label.trim().to_uppercase()).await
    }

    /// All roles ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        self.roles.list_roles().await
    }

    /// The role assigned when none is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    pub async fn default_role(&self) -> Result<Option<Role>, RepositoryError> {
        self.roles.find_default_role().await
    }
}
