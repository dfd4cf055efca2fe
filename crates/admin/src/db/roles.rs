//! Role repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use folio_core::RoleId;

use super::admins::{parse_permissions, permission_strings};
use super::{PgStore, RepositoryError, RoleStore, map_unique_violation};
use crate::models::{NewRole, Role};

const ROLE_COLUMNS: &str =
    "id, name, code, description, permissions, is_default, is_active, created_at, updated_at";

/// Internal row type for `PostgreSQL` role queries.
#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i32,
    name: String,
    code: String,
    description: String,
    permissions: Vec<String>,
    is_default: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = RepositoryError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RoleId::new(row.id),
            permissions: parse_permissions(&row.permissions)?,
            name: row.name,
            code: row.code,
            description: row.description,
            is_default: row.is_default,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn find_role_by_code(&self, code: &str) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM admin.role WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_role(&self, role: NewRole) -> Result<Role, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            r"
            INSERT INTO admin.role (name, code, description, permissions, is_default)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ROLE_COLUMNS}
            "
        ))
        .bind(&role.name)
        .bind(&role.code)
        .bind(&role.description)
        .bind(permission_strings(&role.permissions))
        .bind(role.is_default)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_unique_violation(e, "role"))?;

        row.try_into()
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM admin.role ORDER BY code"
        ))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_default_role(&self) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM admin.role WHERE is_default AND is_active LIMIT 1"
        ))
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
