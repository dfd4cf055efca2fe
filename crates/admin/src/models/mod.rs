//! Domain models for admin.

pub mod action_log;
pub mod admin;
pub mod role;
pub mod session;

pub use action_log::{ActionLog, AuditAction};
pub use admin::{
    Admin, AdminChanges, AdminFilter, AdminPage, AdminPatch, AdminRecord, AdminStats, CreateAdmin,
    NewAdmin, RoleCount, RoleStats, TwoFactorUpdate,
};
pub use role::{NewRole, Role};
pub use session::{ClientInfo, CurrentAdmin};
