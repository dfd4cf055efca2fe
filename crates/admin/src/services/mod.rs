//! Business logic services for admin.
//!
//! # Services
//!
//! - `admins` - Admin account management with last-super-admin protection
//! - `auth` - Password login, TOTP 2FA, password reset, JWT sessions
//! - `email` - Email delivery via SMTP
//! - `password` - Argon2id hashing and password policy
//! - `roles` - Built-in role seeding and lookup

pub mod admins;
pub mod auth;
pub mod email;
pub mod password;
pub mod roles;

pub use admins::{AdminService, AdminServiceError};
pub use auth::{AuthError, AuthService, AuthSettings, LoginOutcome, Session};
pub use email::{EmailError, EmailService, Mailer};
pub use roles::RoleService;
