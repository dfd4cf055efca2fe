//! In-memory store for tests and local runs.
//!
//! Mirrors the `PostgreSQL` semantics: unique emails and role codes,
//! guarded super admin writes, atomic reset-token consumption. Every guarded
//! operation checks and writes under a single write lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use folio_core::{ActionLogId, AdminId, Email, RoleId};

use super::{ActionLogStore, AdminStore, GuardOutcome, RepositoryError, RoleStore};
use crate::models::{
    ActionLog, Admin, AdminFilter, AdminPatch, AdminRecord, AuditAction, NewAdmin, NewRole, Role,
    RoleCount, TwoFactorUpdate,
};

#[derive(Default)]
struct Inner {
    admins: BTreeMap<AdminId, AdminRecord>,
    roles: Vec<Role>,
    logs: Vec<ActionLog>,
    last_admin_id: i32,
    last_role_id: i32,
    last_log_id: i32,
}

impl Inner {
    fn email_taken(&self, email: &Email, except: Option<AdminId>) -> bool {
        self.admins
            .values()
            .any(|r| &r.admin.email == email && Some(r.admin.id) != except)
    }

    fn super_admins(&self) -> impl Iterator<Item = &Admin> {
        self.admins
            .values()
            .map(|r| &r.admin)
            .filter(|a| a.is_super_admin())
    }

    fn active_super_admins(&self) -> usize {
        self.super_admins().filter(|a| a.is_active).count()
    }

    fn record_mut(&mut self, id: AdminId) -> Result<&mut AdminRecord, RepositoryError> {
        self.admins.get_mut(&id).ok_or(RepositoryError::NotFound)
    }
}

/// Store backed by process memory. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every audit entry written so far, oldest first.
    pub async fn action_logs(&self) -> Vec<ActionLog> {
        self.inner.read().await.logs.clone()
    }

    /// The full stored record, secrets included.
    pub async fn record(&self, id: AdminId) -> Option<AdminRecord> {
        self.inner.read().await.admins.get(&id).cloned()
    }

    /// Overwrite a reset token's expiry.
    pub async fn expire_reset_token(&self, id: AdminId, expires_at: DateTime<Utc>) {
        if let Some(record) = self.inner.write().await.admins.get_mut(&id) {
            record.reset_token_expires_at = Some(expires_at);
        }
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn find_admin_by_id(&self, id: AdminId) -> Result<Option<AdminRecord>, RepositoryError> {
        Ok(self.inner.read().await.admins.get(&id).cloned())
    }

    async fn find_admin_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AdminRecord>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .admins
            .values()
            .find(|r| &r.admin.email == email)
            .cloned())
    }

    async fn insert_admin(&self, new: NewAdmin) -> Result<Admin, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner.email_taken(&new.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        inner.last_admin_id += 1;
        let id = AdminId::new(inner.last_admin_id);
        let now = Utc::now();
        let admin = Admin {
            id,
            email: new.email,
            name: new.name,
            role: new.role,
            permissions: new.permissions,
            is_active: new.is_active,
            two_factor_enabled: false,
            last_login: None,
            last_login_ip: None,
            password_changed_at: None,
            created_by: new.created_by,
            updated_by: new.created_by,
            created_at: now,
            updated_at: now,
        };

        inner.admins.insert(
            id,
            AdminRecord {
                admin: admin.clone(),
                password_hash: new.password_hash,
                two_factor_secret: None,
                backup_code_hashes: Vec::new(),
                reset_token_hash: None,
                reset_token_expires_at: None,
            },
        );

        Ok(admin)
    }

    async fn update_admin(
        &self,
        id: AdminId,
        patch: AdminPatch,
    ) -> Result<GuardOutcome<Admin>, RepositoryError> {
        let mut inner = self.inner.write().await;

        let Some(current) = inner.admins.get(&id) else {
            return Ok(GuardOutcome::NotFound);
        };

        if patch.demotes(&current.admin)
            && current.admin.is_active
            && inner.active_super_admins() <= 1
        {
            return Ok(GuardOutcome::LastSuperAdmin);
        }

        if let Some(email) = &patch.email
            && inner.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let record = inner.record_mut(id)?;
        let now = Utc::now();
        let admin = &mut record.admin;

        if let Some(email) = patch.email {
            admin.email = email;
        }
        if let Some(name) = patch.name {
            admin.name = name;
        }
        if let Some((role, permissions)) = patch.role {
            admin.role = role;
            admin.permissions = permissions;
        }
        if let Some(password_hash) = patch.password_hash {
            record.password_hash = password_hash;
            record.admin.password_changed_at = Some(now);
        }
        if patch.updated_by.is_some() {
            record.admin.updated_by = patch.updated_by;
        }
        record.admin.updated_at = now;

        Ok(GuardOutcome::Applied(record.admin.clone()))
    }

    async fn list_admins(
        &self,
        filter: &AdminFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Admin>, i64), RepositoryError> {
        let inner = self.inner.read().await;

        let mut matches: Vec<&Admin> = inner
            .admins
            .values()
            .map(|r| &r.admin)
            .filter(|a| filter.matches(a))
            .collect();
        matches.sort_by(|a, b| (b.created_at, b.id.as_i32()).cmp(&(a.created_at, a.id.as_i32())));

        let total = i64::try_from(matches.len())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        let page = matches.into_iter().skip(skip).take(take).cloned().collect();
        Ok((page, total))
    }

    async fn delete_admin(&self, id: AdminId) -> Result<GuardOutcome<()>, RepositoryError> {
        let mut inner = self.inner.write().await;

        let Some(target) = inner.admins.get(&id) else {
            return Ok(GuardOutcome::NotFound);
        };

        if target.admin.is_super_admin()
            && (inner.super_admins().count() <= 1
                || (target.admin.is_active && inner.active_super_admins() <= 1))
        {
            return Ok(GuardOutcome::LastSuperAdmin);
        }

        inner.admins.remove(&id);
        Ok(GuardOutcome::Applied(()))
    }

    async fn set_admin_active(
        &self,
        id: AdminId,
        is_active: bool,
        updated_by: Option<AdminId>,
    ) -> Result<GuardOutcome<Admin>, RepositoryError> {
        let mut inner = self.inner.write().await;

        let Some(target) = inner.admins.get(&id) else {
            return Ok(GuardOutcome::NotFound);
        };

        if !is_active
            && target.admin.is_super_admin()
            && target.admin.is_active
            && inner.active_super_admins() <= 1
        {
            return Ok(GuardOutcome::LastSuperAdmin);
        }

        let record = inner.record_mut(id)?;
        record.admin.is_active = is_active;
        if updated_by.is_some() {
            record.admin.updated_by = updated_by;
        }
        record.admin.updated_at = Utc::now();

        Ok(GuardOutcome::Applied(record.admin.clone()))
    }

    async fn role_counts(&self) -> Result<Vec<RoleCount>, RepositoryError> {
        let inner = self.inner.read().await;

        let mut counts: BTreeMap<&str, RoleCount> = BTreeMap::new();
        for admin in inner.admins.values().map(|r| &r.admin) {
            let entry = counts.entry(admin.role.as_str()).or_insert_with(|| RoleCount {
                role: admin.role.clone(),
                active: 0,
                inactive: 0,
            });
            if admin.is_active {
                entry.active += 1;
            } else {
                entry.inactive += 1;
            }
        }

        Ok(counts.into_values().collect())
    }

    async fn record_login(
        &self,
        id: AdminId,
        at: DateTime<Utc>,
        ip: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let record = inner.record_mut(id)?;
        record.admin.last_login = Some(at);
        record.admin.last_login_ip = ip.map(str::to_owned);
        Ok(())
    }

    async fn set_two_factor(
        &self,
        id: AdminId,
        update: TwoFactorUpdate,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let record = inner.record_mut(id)?;

        match update {
            TwoFactorUpdate::Pending { secret } => {
                record.two_factor_secret = Some(secret);
                record.admin.two_factor_enabled = false;
                record.backup_code_hashes.clear();
            }
            TwoFactorUpdate::Enabled { backup_code_hashes } => {
                if record.two_factor_secret.is_none() {
                    return Err(RepositoryError::NotFound);
                }
                record.admin.two_factor_enabled = true;
                record.backup_code_hashes = backup_code_hashes;
            }
            TwoFactorUpdate::Disabled => {
                record.two_factor_secret = None;
                record.admin.two_factor_enabled = false;
                record.backup_code_hashes.clear();
            }
        }
        record.admin.updated_at = Utc::now();

        Ok(())
    }

    async fn consume_backup_code(
        &self,
        id: AdminId,
        code_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.admins.get_mut(&id) else {
            return Ok(false);
        };

        let before = record.backup_code_hashes.len();
        record.backup_code_hashes.retain(|h| h != code_hash);
        Ok(record.backup_code_hashes.len() < before)
    }

    async fn set_reset_token(
        &self,
        id: AdminId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let record = inner.record_mut(id)?;
        record.reset_token_hash = Some(token_hash.to_owned());
        record.reset_token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Admin>, RepositoryError> {
        let mut inner = self.inner.write().await;

        let Some(record) = inner.admins.values_mut().find(|r| {
            r.reset_token_hash.as_deref() == Some(token_hash)
                && r.reset_token_expires_at.is_some_and(|exp| exp > now)
        }) else {
            return Ok(None);
        };

        record.password_hash = password_hash.to_owned();
        record.reset_token_hash = None;
        record.reset_token_expires_at = None;
        record.admin.password_changed_at = Some(now);
        record.admin.updated_at = now;

        Ok(Some(record.admin.clone()))
    }

    async fn set_password(
        &self,
        id: AdminId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let record = inner.record_mut(id)?;
        record.password_hash = password_hash.to_owned();
        record.admin.password_changed_at = Some(at);
        record.admin.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_role_by_code(&self, code: &str) -> Result<Option<Role>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .roles
            .iter()
            .find(|r| r.code == code)
            .cloned())
    }

    async fn insert_role(&self, new: NewRole) -> Result<Role, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner
            .roles
            .iter()
            .any(|r| r.code == new.code || r.name == new.name || (new.is_default && r.is_default))
        {
            return Err(RepositoryError::Conflict("role already exists".to_owned()));
        }

        inner.last_role_id += 1;
        let now = Utc::now();
        let role = Role {
            id: RoleId::new(inner.last_role_id),
            name: new.name,
            code: new.code,
            description: new.description,
            permissions: new.permissions,
            is_default: new.is_default,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.roles.push(role.clone());

        Ok(role)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        let mut roles = self.inner.read().await.roles.clone();
        roles.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(roles)
    }

    async fn find_default_role(&self) -> Result<Option<Role>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .roles
            .iter()
            .find(|r| r.is_default && r.is_active)
            .cloned())
    }
}

#[async_trait]
impl ActionLogStore for MemoryStore {
    async fn create_action_log(
        &self,
        actor: Option<AdminId>,
        action: AuditAction,
        metadata: serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.last_log_id += 1;
        let entry = ActionLog {
            id: ActionLogId::new(inner.last_log_id),
            admin_id: actor,
            action,
            metadata,
            created_at: Utc::now(),
        };
        inner.logs.push(entry);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use folio_core::BuiltinRole;

    use super::*;

    fn new_admin(email: &str, role: BuiltinRole) -> NewAdmin {
        NewAdmin {
            email: Email::parse(email).unwrap(),
            name: email.to_owned(),
            password_hash: "hash".to_owned(),
            role: role.label().to_owned(),
            permissions: role.permissions(),
            is_active: true,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store
            .insert_admin(new_admin("a@x.com", BuiltinRole::Admin))
            .await
            .unwrap();

        let err = store
            .insert_admin(new_admin("A@X.com", BuiltinRole::Viewer))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_last_super_admin_guards() {
        let store = MemoryStore::new();
        let root = store
            .insert_admin(new_admin("root@x.com", BuiltinRole::SuperAdmin))
            .await
            .unwrap();

        assert_eq!(
            store.delete_admin(root.id).await.unwrap(),
            GuardOutcome::LastSuperAdmin
        );
        assert_eq!(
            store.set_admin_active(root.id, false, None).await.unwrap(),
            GuardOutcome::LastSuperAdmin
        );

        let demote = AdminPatch {
            role: Some(("admin".to_owned(), BuiltinRole::Admin.permissions())),
            ..Default::default()
        };
        assert_eq!(
            store.update_admin(root.id, demote).await.unwrap(),
            GuardOutcome::LastSuperAdmin
        );

        let root = store.find_admin_by_id(root.id).await.unwrap().unwrap();
        assert!(root.admin.is_active);
        assert!(root.admin.is_super_admin());
    }

    #[tokio::test]
    async fn test_delete_keeps_one_active_super_admin() {
        let store = MemoryStore::new();
        let a = store
            .insert_admin(new_admin("a@x.com", BuiltinRole::SuperAdmin))
            .await
            .unwrap();
        let b = store
            .insert_admin(new_admin("b@x.com", BuiltinRole::SuperAdmin))
            .await
            .unwrap();

        assert!(matches!(
            store.set_admin_active(b.id, false, None).await.unwrap(),
            GuardOutcome::Applied(_)
        ));
        // `a` is now the only active super admin; `b` existing is not enough.
        assert_eq!(
            store.set_admin_active(a.id, false, None).await.unwrap(),
            GuardOutcome::LastSuperAdmin
        );
        assert_eq!(
            store.delete_admin(a.id).await.unwrap(),
            GuardOutcome::LastSuperAdmin
        );

        // The inactive one can go while `a` stays active.
        assert_eq!(
            store.delete_admin(b.id).await.unwrap(),
            GuardOutcome::Applied(())
        );
        let a = store.find_admin_by_id(a.id).await.unwrap().unwrap();
        assert!(a.admin.is_active);
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use_and_expires() {
        let store = MemoryStore::new();
        let admin = store
            .insert_admin(new_admin("a@x.com", BuiltinRole::Viewer))
            .await
            .unwrap();
        let now = Utc::now();

        store
            .set_reset_token(admin.id, "digest", now + chrono::Duration::minutes(60))
            .await
            .unwrap();
        assert!(store
            .consume_reset_token("digest", "new-hash", now)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .consume_reset_token("digest", "other-hash", now)
            .await
            .unwrap()
            .is_none());

        store
            .set_reset_token(admin.id, "stale", now - chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert!(store
            .consume_reset_token("stale", "other-hash", now)
            .await
            .unwrap()
            .is_none());

        let record = store.record(admin.id).await.unwrap();
        assert_eq!(record.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_admin(new_admin(&format!("user{i}@x.com"), BuiltinRole::Viewer))
                .await
                .unwrap();
        }
        store
            .insert_admin(new_admin("boss@x.com", BuiltinRole::Admin))
            .await
            .unwrap();

        let viewers = AdminFilter {
            role: Some("viewer".to_owned()),
            ..Default::default()
        };
        let (page, total) = store.list_admins(&viewers, 2, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);

        let (rest, _) = store.list_admins(&viewers, 4, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[tokio::test]
    async fn test_backup_code_consumed_once() {
        let store = MemoryStore::new();
        let admin = store
            .insert_admin(new_admin("a@x.com", BuiltinRole::Viewer))
            .await
            .unwrap();
        store
            .set_two_factor(
                admin.id,
                TwoFactorUpdate::Pending {
                    secret: "SECRET".to_owned(),
                },
            )
            .await
            .unwrap();
        store
            .set_two_factor(
                admin.id,
                TwoFactorUpdate::Enabled {
                    backup_code_hashes: vec!["c1".to_owned(), "c2".to_owned()],
                },
            )
            .await
            .unwrap();

        assert!(store.consume_backup_code(admin.id, "c1").await.unwrap());
        assert!(!store.consume_backup_code(admin.id, "c1").await.unwrap());
        assert_eq!(
            store.record(admin.id).await.unwrap().backup_code_hashes,
            vec!["c2".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_single_default_role() {
        let store = MemoryStore::new();
        store
            .insert_role(NewRole::from(BuiltinRole::Viewer))
            .await
            .unwrap();

        let mut second = NewRole::from(BuiltinRole::Moderator);
        second.is_default = true;
        assert!(store.insert_role(second).await.is_err());
    }
}
