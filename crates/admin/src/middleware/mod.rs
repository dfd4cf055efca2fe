//! HTTP middleware and extractors for admin.
//!
//! # Layer Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//!
//! Authentication is not a layer: handlers take [`RequireAdmin`], which
//! verifies the bearer token and reloads the account, then call
//! [`RequireAdmin::require`] for the permission they need.

pub mod auth;

pub use auth::{RequireAdmin, bearer_token};
