//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::db::{ActionLogStore, AdminStore, PgStore, RoleStore};
use crate::services::auth::{AuthSettings, TokenIssuer, TotpFactory};
use crate::services::{AdminService, AuthService, EmailService, Mailer, RoleService};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("SMTP configuration error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services hold the store behind trait
/// objects, so the same state works over `PostgreSQL` or in memory.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn AdminStore>,
    auth: AuthService,
    admins: AdminService,
    roles: RoleService,
}

impl AppState {
    /// Wire services over one store that implements every store trait.
    #[must_use]
    pub fn new<S>(store: S, mailer: Arc<dyn Mailer>, settings: AuthSettings) -> Self
    where
        S: AdminStore + RoleStore + ActionLogStore + Clone + 'static,
    {
        let admin_store: Arc<dyn AdminStore> = Arc::new(store.clone());
        let log_store: Arc<dyn ActionLogStore> = Arc::new(store.clone());
        let roles = RoleService::new(Arc::new(store));

        let auth = AuthService::new(admin_store.clone(), log_store.clone(), mailer, settings);
        let admins = AdminService::new(admin_store.clone(), log_store, roles.clone());

        Self {
            inner: Arc::new(AppStateInner {
                store: admin_store,
                auth,
                admins,
                roles,
            }),
        }
    }

    /// Production wiring: `PostgreSQL` store and SMTP mailer.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Smtp` if the SMTP relay cannot be configured.
    pub fn from_config(config: &AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer = EmailService::new(&config.email, config.reset_token_ttl_minutes)?;
        let settings = AuthSettings {
            tokens: TokenIssuer::new(&config.jwt.secret, config.jwt.expires_in),
            totp: TotpFactory::new(config.totp_issuer.clone()),
            portal_url: config.portal_url.clone(),
            reset_token_ttl: config.reset_token_ttl(),
        };

        Ok(Self::new(PgStore::new(pool), Arc::new(mailer), settings))
    }

    /// Get a reference to the account store, for readiness checks.
    #[must_use]
    pub fn store(&self) -> &dyn AdminStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn admins(&self) -> &AdminService {
        &self.inner.admins
    }

    #[must_use]
    pub fn roles(&self) -> &RoleService {
        &self.inner.roles
    }
}
