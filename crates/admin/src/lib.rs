//! Folio admin authentication library.
//!
//! Admin accounts, roles, and the login, 2FA and password-reset flows for
//! the Folio admin portal, exposed as a JSON API.
//!
//! # Security
//!
//! This crate holds admin credentials:
//! - Argon2id password hashes and TOTP secrets
//! - The JWT signing key
//! - Reset-token and backup-code digests
//!
//! Secrets never leave the store layer; services return sanitized [`models::Admin`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;
