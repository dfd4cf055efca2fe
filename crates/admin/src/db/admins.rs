//! Admin account repository for `PostgreSQL`.
//!
//! Queries are built at runtime with `sqlx::query_as` and `QueryBuilder`;
//! rows decode into internal row types and convert into domain types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};

use folio_core::{AdminId, BuiltinRole, Email, Permission};

use super::{AdminStore, GuardOutcome, PgStore, RepositoryError, map_unique_violation};
use crate::models::{
    Admin, AdminFilter, AdminPatch, AdminRecord, NewAdmin, RoleCount, TwoFactorUpdate,
};

const ADMIN_COLUMNS: &str = "id, email, password_hash, name, role, permissions, is_active, \
     two_factor_secret, two_factor_enabled, backup_code_hashes, last_login, last_login_ip, \
     reset_token_hash, reset_token_expires_at, password_changed_at, created_by, updated_by, \
     created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` admin account queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id: i32,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    permissions: Vec<String>,
    is_active: bool,
    two_factor_secret: Option<String>,
    two_factor_enabled: bool,
    backup_code_hashes: Vec<String>,
    last_login: Option<DateTime<Utc>>,
    last_login_ip: Option<String>,
    reset_token_hash: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
    password_changed_at: Option<DateTime<Utc>>,
    created_by: Option<i32>,
    updated_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for AdminRecord {
    type Error = RepositoryError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let permissions = parse_permissions(&row.permissions)?;

        Ok(Self {
            admin: Admin {
                id: AdminId::new(row.id),
                email,
                name: row.name,
                role: row.role,
                permissions,
                is_active: row.is_active,
                two_factor_enabled: row.two_factor_enabled,
                last_login: row.last_login,
                last_login_ip: row.last_login_ip,
                password_changed_at: row.password_changed_at,
                created_by: row.created_by.map(AdminId::new),
                updated_by: row.updated_by.map(AdminId::new),
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            password_hash: row.password_hash,
            two_factor_secret: row.two_factor_secret,
            backup_code_hashes: row.backup_code_hashes,
            reset_token_hash: row.reset_token_hash,
            reset_token_expires_at: row.reset_token_expires_at,
        })
    }
}

/// Internal row type for per-role counts.
#[derive(Debug, sqlx::FromRow)]
struct RoleCountRow {
    role: String,
    active: i64,
    inactive: i64,
}

/// Parse stored permission strings, rejecting anything outside the catalog.
pub(super) fn parse_permissions(raw: &[String]) -> Result<Vec<Permission>, RepositoryError> {
    raw.iter()
        .map(|p| {
            p.parse::<Permission>().map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid permission in database: {e}"))
            })
        })
        .collect()
}

pub(super) fn permission_strings(permissions: &[Permission]) -> Vec<String> {
    permissions.iter().map(|p| p.as_str().to_owned()).collect()
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AdminFilter) {
    qb.push(" WHERE TRUE");
    if let Some(role) = &filter.role {
        qb.push(" AND role = ").push_bind(role.clone());
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(search) = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Super admin headcount taken while holding row locks.
struct SuperAdminLock {
    total: usize,
    active: usize,
}

/// Lock every `super_admin` row (in id order) and count them.
///
/// Callers take this lock before locking the target row so concurrent
/// guarded writes always acquire locks in the same order.
async fn lock_super_admins(conn: &mut PgConnection) -> Result<SuperAdminLock, RepositoryError> {
    let flags: Vec<bool> = sqlx::query_scalar(
        "SELECT is_active FROM admin.admin_account WHERE role = $1 ORDER BY id FOR UPDATE",
    )
    .bind(BuiltinRole::SuperAdmin.label())
    .fetch_all(&mut *conn)
    .await?;

    Ok(SuperAdminLock {
        total: flags.len(),
        active: flags.iter().filter(|active| **active).count(),
    })
}

async fn lock_admin(
    conn: &mut PgConnection,
    id: AdminId,
) -> Result<Option<AdminRecord>, RepositoryError> {
    let row = sqlx::query_as::<_, AdminRow>(&format!(
        "SELECT {ADMIN_COLUMNS} FROM admin.admin_account WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

fn expect_affected(rows: u64) -> Result<(), RepositoryError> {
    if rows == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl AdminStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    async fn find_admin_by_id(&self, id: AdminId) -> Result<Option<AdminRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin.admin_account WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_admin_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AdminRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin.admin_account WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            r"
            INSERT INTO admin.admin_account
                (email, password_hash, name, role, permissions, is_active, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(admin.email.as_str())
        .bind(&admin.password_hash)
        .bind(&admin.name)
        .bind(&admin.role)
        .bind(permission_strings(&admin.permissions))
        .bind(admin.is_active)
        .bind(admin.created_by.map(|id| id.as_i32()))
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        AdminRecord::try_from(row).map(AdminRecord::into_admin)
    }

    async fn update_admin(
        &self,
        id: AdminId,
        patch: AdminPatch,
    ) -> Result<GuardOutcome<Admin>, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let super_admins = if patch.role.is_some() {
            Some(lock_super_admins(&mut tx).await?)
        } else {
            None
        };

        let Some(current) = lock_admin(&mut tx, id).await? else {
            return Ok(GuardOutcome::NotFound);
        };

        if patch.demotes(&current.admin)
            && current.admin.is_active
            && super_admins.is_some_and(|lock| lock.active <= 1)
        {
            return Ok(GuardOutcome::LastSuperAdmin);
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "UPDATE admin.admin_account SET updated_by = COALESCE(",
        );
        qb.push_bind(patch.updated_by.map(|id| id.as_i32()))
            .push(", updated_by)");
        if let Some(email) = patch.email {
            qb.push(", email = ").push_bind(email.into_inner());
        }
        if let Some(name) = patch.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some((role, permissions)) = patch.role {
            qb.push(", role = ").push_bind(role);
            qb.push(", permissions = ")
                .push_bind(permission_strings(&permissions));
        }
        if let Some(password_hash) = patch.password_hash {
            qb.push(", password_hash = ")
                .push_bind(password_hash)
                .push(", password_changed_at = now()");
        }
        qb.push(" WHERE id = ").push_bind(id.as_i32());
        qb.push(" RETURNING ").push(ADMIN_COLUMNS);

        let row = qb
            .build_query_as::<AdminRow>()
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "email"))?;

        tx.commit().await?;

        AdminRecord::try_from(row)
            .map(AdminRecord::into_admin)
            .map(GuardOutcome::Applied)
    }

    async fn list_admins(
        &self,
        filter: &AdminFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Admin>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM admin.admin_account");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool())
            .await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT ");
        select.push(ADMIN_COLUMNS).push(" FROM admin.admin_account");
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build_query_as::<AdminRow>()
            .fetch_all(self.pool())
            .await?;

        let admins = rows
            .into_iter()
            .map(|row| AdminRecord::try_from(row).map(AdminRecord::into_admin))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((admins, total))
    }

    async fn delete_admin(&self, id: AdminId) -> Result<GuardOutcome<()>, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let super_admins = lock_super_admins(&mut tx).await?;
        let Some(target) = lock_admin(&mut tx, id).await? else {
            return Ok(GuardOutcome::NotFound);
        };

        if target.admin.is_super_admin()
            && (super_admins.total <= 1 || (target.admin.is_active && super_admins.active <= 1))
        {
            return Ok(GuardOutcome::LastSuperAdmin);
        }

        sqlx::query("DELETE FROM admin.admin_account WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(GuardOutcome::Applied(()))
    }

    async fn set_admin_active(
        &self,
        id: AdminId,
        is_active: bool,
        updated_by: Option<AdminId>,
    ) -> Result<GuardOutcome<Admin>, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let super_admins = if is_active {
            None
        } else {
            Some(lock_super_admins(&mut tx).await?)
        };

        let Some(target) = lock_admin(&mut tx, id).await? else {
            return Ok(GuardOutcome::NotFound);
        };

        if target.admin.is_super_admin()
            && target.admin.is_active
            && super_admins.is_some_and(|lock| lock.active <= 1)
        {
            return Ok(GuardOutcome::LastSuperAdmin);
        }

        let row = sqlx::query_as::<_, AdminRow>(&format!(
            r"
            UPDATE admin.admin_account
            SET is_active = $2, updated_by = COALESCE($3, updated_by)
            WHERE id = $1
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(is_active)
        .bind(updated_by.map(|id| id.as_i32()))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        AdminRecord::try_from(row)
            .map(AdminRecord::into_admin)
            .map(GuardOutcome::Applied)
    }

    async fn role_counts(&self) -> Result<Vec<RoleCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleCountRow>(
            r"
            SELECT role,
                   COUNT(*) FILTER (WHERE is_active) AS active,
                   COUNT(*) FILTER (WHERE NOT is_active) AS inactive
            FROM admin.admin_account
            GROUP BY role
            ORDER BY role
            ",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| RoleCount {
                role: r.role,
                active: r.active,
                inactive: r.inactive,
            })
            .collect())
    }

    async fn record_login(
        &self,
        id: AdminId,
        at: DateTime<Utc>,
        ip: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE admin.admin_account SET last_login = $2, last_login_ip = $3 WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(at)
        .bind(ip)
        .execute(self.pool())
        .await?;

        expect_affected(result.rows_affected())
    }

    async fn set_two_factor(
        &self,
        id: AdminId,
        update: TwoFactorUpdate,
    ) -> Result<(), RepositoryError> {
        let query = match update {
            TwoFactorUpdate::Pending { secret } => sqlx::query(
                r"
                UPDATE admin.admin_account
                SET two_factor_secret = $2, two_factor_enabled = false, backup_code_hashes = '{}'
                WHERE id = $1
                ",
            )
            .bind(id.as_i32())
            .bind(secret),
            TwoFactorUpdate::Enabled { backup_code_hashes } => sqlx::query(
                r"
                UPDATE admin.admin_account
                SET two_factor_enabled = true, backup_code_hashes = $2
                WHERE id = $1 AND two_factor_secret IS NOT NULL
                ",
            )
            .bind(id.as_i32())
            .bind(backup_code_hashes),
            TwoFactorUpdate::Disabled => sqlx::query(
                r"
                UPDATE admin.admin_account
                SET two_factor_secret = NULL, two_factor_enabled = false, backup_code_hashes = '{}'
                WHERE id = $1
                ",
            )
            .bind(id.as_i32()),
        };

        let result = query.execute(self.pool()).await?;
        expect_affected(result.rows_affected())
    }

    async fn consume_backup_code(
        &self,
        id: AdminId,
        code_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE admin.admin_account
            SET backup_code_hashes = array_remove(backup_code_hashes, $2)
            WHERE id = $1 AND $2 = ANY(backup_code_hashes)
            ",
        )
        .bind(id.as_i32())
        .bind(code_hash)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_reset_token(
        &self,
        id: AdminId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE admin.admin_account
            SET reset_token_hash = $2, reset_token_expires_at = $3
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool())
        .await?;

        expect_affected(result.rows_affected())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            r"
            UPDATE admin.admin_account
            SET password_hash = $2,
                password_changed_at = $3,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL
            WHERE reset_token_hash = $1 AND reset_token_expires_at > $3
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(token_hash)
        .bind(password_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| AdminRecord::try_from(r).map(AdminRecord::into_admin))
            .transpose()
    }

    async fn set_password(
        &self,
        id: AdminId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE admin.admin_account SET password_hash = $2, password_changed_at = $3 WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(password_hash)
        .bind(at)
        .execute(self.pool())
        .await?;

        expect_affected(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("jane"), "jane");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_parse_permissions_rejects_unknown() {
        let ok = parse_permissions(&["users.view".to_owned(), "logs.clear".to_owned()]);
        assert_eq!(
            ok.ok(),
            Some(vec![Permission::UsersView, Permission::LogsClear])
        );

        let bad = parse_permissions(&["users.fly".to_owned()]);
        assert!(matches!(bad, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn test_filters_build_where_clause() {
        let filter = AdminFilter {
            role: Some("admin".to_owned()),
            is_active: Some(true),
            search: Some(" jane ".to_owned()),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM admin.admin_account");
        push_filters(&mut qb, &filter);

        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM admin.admin_account WHERE TRUE AND role = $1 AND is_active = $2 \
             AND (name ILIKE $3 OR email ILIKE $4)"
        );
    }
}
