//! Admin account management.
//!
//! Create, list, edit, deactivate and delete admin accounts. Every change is
//! written to the audit log. The store enforces that at least one active
//! super admin always remains; this service turns its refusals into
//! [`AdminServiceError::LastSuperAdmin`].

mod error;

pub use error::AdminServiceError;

use std::sync::Arc;

use serde_json::json;

use folio_core::{AdminId, BuiltinRole, Email};

use crate::db::{ActionLogStore, AdminStore, GuardOutcome};
use crate::models::{
    Admin, AdminChanges, AdminFilter, AdminPage, AdminPatch, AdminStats, AuditAction, CreateAdmin,
    CurrentAdmin, NewAdmin, Role,
};
use crate::services::password::{hash_password, validate_password};
use crate::services::roles::RoleService;

use error::email_conflict;

/// Page size when none is requested.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Admin account management service.
#[derive(Clone)]
pub struct AdminService {
    admins: Arc<dyn AdminStore>,
    logs: Arc<dyn ActionLogStore>,
    roles: RoleService,
}

impl AdminService {
    #[must_use]
    pub fn new(
        admins: Arc<dyn AdminStore>,
        logs: Arc<dyn ActionLogStore>,
        roles: RoleService,
    ) -> Self {
        Self {
            admins,
            logs,
            roles,
        }
    }

    /// Create an account.
    ///
    /// The email is lowercased, the password hashed, and the role's current
    /// permissions copied onto the account. Without a role the default role
    /// is used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEmail`, `MissingName`, `WeakPassword`,
    /// `DuplicateEmail`, `InvalidRole`, or an infrastructure error.
    #[tracing::instrument(skip(self, data), fields(email = %data.email))]
    pub async fn create_admin(
        &self,
        data: CreateAdmin,
        created_by: Option<AdminId>,
    ) -> Result<Admin, AdminServiceError> {
        let email = Email::parse(&data.email)?;
        let name = required_name(&data.name)?;
        validate_password(&data.password)?;

        if self.admins.find_admin_by_email(&email).await?.is_some() {
            return Err(AdminServiceError::DuplicateEmail);
        }

        let role = match data.role.as_deref() {
            Some(label) => self.resolve_role(label).await?,
            None => self
                .roles
                .default_role()
                .await?
                .ok_or_else(|| AdminServiceError::InvalidRole("no default role".to_owned()))?,
        };

        let password_hash = hash_password(&data.password).await?;
        let admin = self
            .admins
            .insert_admin(NewAdmin {
                email,
                name,
                password_hash,
                role: role.label(),
                permissions: role.permissions,
                is_active: data.is_active.unwrap_or(true),
                created_by,
            })
            .await
            .map_err(email_conflict)?;

        self.audit(
            created_by,
            AuditAction::AdminCreated,
            json!({ "targetId": admin.id, "email": admin.email, "role": admin.role }),
        )
        .await;
        tracing::info!(admin_id = %admin.id, role = %admin.role, "Admin created");

        Ok(admin)
    }

    /// Fetch one account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a repository error.
    pub async fn get_admin_by_id(&self, id: AdminId) -> Result<Admin, AdminServiceError> {
        self.admins
            .find_admin_by_id(id)
            .await?
            .map(|record| record.into_admin())
            .ok_or(AdminServiceError::NotFound)
    }

    /// Page through accounts, newest first.
    ///
    /// `page` starts at 1. `limit` defaults to [`DEFAULT_PAGE_SIZE`] and is
    /// capped at [`MAX_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns a repository error.
    pub async fn list_admins(
        &self,
        filter: &AdminFilter,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<AdminPage, AdminServiceError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(limit);

        let (items, total) = self.admins.list_admins(filter, offset, limit).await?;

        Ok(AdminPage {
            items,
            total,
            page,
            limit,
            pages: (total + limit - 1) / limit,
        })
    }

    /// Apply a partial update.
    ///
    /// Only a super admin may change roles. A role change re-copies the
    /// role's permissions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidEmail`, `MissingName`, `DuplicateEmail`,
    /// `Forbidden`, `InvalidRole`, `WeakPassword`, `LastSuperAdmin`, or an
    /// infrastructure error.
    #[tracing::instrument(skip(self, changes, acting), fields(acting_id = %acting.id))]
    pub async fn update_admin(
        &self,
        id: AdminId,
        changes: AdminChanges,
        acting: &CurrentAdmin,
    ) -> Result<Admin, AdminServiceError> {
        let current = self.get_admin_by_id(id).await?;

        let mut patch = AdminPatch {
            updated_by: Some(acting.id),
            ..AdminPatch::default()
        };
        let mut fields = Vec::new();

        if let Some(raw) = changes.email.as_deref() {
            let email = Email::parse(raw)?;
            if email != current.email {
                if let Some(other) = self.admins.find_admin_by_email(&email).await?
                    && other.admin.id != id
                {
                    return Err(AdminServiceError::DuplicateEmail);
                }
                patch.email = Some(email);
                fields.push("email");
            }
        }

        if let Some(raw) = changes.name.as_deref() {
            patch.name = Some(required_name(raw)?);
            fields.push("name");
        }

        if let Some(label) = changes.role.as_deref() {
            let role = self.resolve_role(label).await?;
            // Resubmitting the current role is not a role change.
            if role.label() != current.role {
                if acting.role != BuiltinRole::SuperAdmin.label() {
                    return Err(AdminServiceError::Forbidden(
                        "only a super admin can change roles",
                    ));
                }
                patch.role = Some((role.label(), role.permissions));
                fields.push("role");
            }
        }

        if let Some(password) = changes.password.as_deref() {
            validate_password(password)?;
            patch.password_hash = Some(hash_password(password).await?);
            fields.push("password");
        }

        let admin = match self
            .admins
            .update_admin(id, patch)
            .await
            .map_err(email_conflict)?
        {
            GuardOutcome::Applied(admin) => admin,
            GuardOutcome::NotFound => return Err(AdminServiceError::NotFound),
            GuardOutcome::LastSuperAdmin => return Err(AdminServiceError::LastSuperAdmin),
        };

        self.audit(
            Some(acting.id),
            AuditAction::AdminUpdated,
            json!({ "targetId": id, "fields": fields }),
        )
        .await;
        tracing::info!(admin_id = %id, ?fields, "Admin updated");

        Ok(admin)
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns `SelfDeletion`, `NotFound`, `LastSuperAdmin`, or a repository
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_admin(
        &self,
        id: AdminId,
        acting_id: AdminId,
    ) -> Result<(), AdminServiceError> {
        if id == acting_id {
            return Err(AdminServiceError::SelfDeletion);
        }

        match self.admins.delete_admin(id).await? {
            GuardOutcome::Applied(()) => {}
            GuardOutcome::NotFound => return Err(AdminServiceError::NotFound),
            GuardOutcome::LastSuperAdmin => return Err(AdminServiceError::LastSuperAdmin),
        }

        self.audit(
            Some(acting_id),
            AuditAction::AdminDeleted,
            json!({ "targetId": id }),
        )
        .await;
        tracing::info!(admin_id = %id, "Admin deleted");
        Ok(())
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `LastSuperAdmin`, or a repository error.
    #[tracing::instrument(skip(self))]
    pub async fn set_active_status(
        &self,
        id: AdminId,
        is_active: bool,
        acting_id: Option<AdminId>,
    ) -> Result<Admin, AdminServiceError> {
        let admin = match self.admins.set_admin_active(id, is_active, acting_id).await? {
            GuardOutcome::Applied(admin) => admin,
            GuardOutcome::NotFound => return Err(AdminServiceError::NotFound),
            GuardOutcome::LastSuperAdmin => return Err(AdminServiceError::LastSuperAdmin),
        };

        self.audit(
            acting_id,
            AuditAction::AdminStatusChanged,
            json!({ "targetId": id, "isActive": is_active }),
        )
        .await;
        tracing::info!(admin_id = %id, is_active, "Admin status changed");

        Ok(admin)
    }

    /// Account counts per role with active/inactive split.
    ///
    /// # Errors
    ///
    /// Returns a repository error.
    pub async fn get_stats(&self) -> Result<AdminStats, AdminServiceError> {
        Ok(AdminStats::from(self.admins.role_counts().await?))
    }

    async fn resolve_role(&self, label: &str) -> Result<Role, AdminServiceError> {
        self.roles
            .resolve(label)
            .await?
            .filter(|role| role.is_active)
            .ok_or_else(|| AdminServiceError::InvalidRole(label.to_owned()))
    }

    async fn audit(&self, actor: Option<AdminId>, action: AuditAction, metadata: serde_json::Value) {
        if let Err(e) = self.logs.create_action_log(actor, action, metadata).await {
            tracing::error!(%action, error = %e, "Failed to write audit log");
        }
    }
}

fn required_name(raw: &str) -> Result<String, AdminServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AdminServiceError::MissingName);
    }
    Ok(name.to_owned())
}
