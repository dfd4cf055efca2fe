//! Folio Core - Shared types library.
//!
//! This crate provides common types used across all Folio admin components:
//! - `admin` - Admin API server (authentication, account and role management)
//! - `cli` - Command-line tools for migrations, role seeding and bootstrapping
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and emails, the permission
//!   catalog and the built-in role definitions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
