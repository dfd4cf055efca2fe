//! Shared doubles for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use secrecy::SecretString;

use folio_core::{BuiltinRole, Email};

use crate::db::{AdminStore, MemoryStore};
use crate::models::{Admin, NewAdmin};
use crate::services::auth::{AuthService, AuthSettings, TokenIssuer, TotpFactory};
use crate::services::email::{EmailError, Mailer};
use crate::services::password::hash_password;

/// An email the auth service tried to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentEmail {
    PasswordReset { to: String, reset_url: String },
    PasswordChanged { to: String },
}

/// Mailer that keeps messages in memory.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset_email(
        &self,
        to: &Email,
        _name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail::PasswordReset {
            to: to.as_str().to_owned(),
            reset_url: reset_url.to_owned(),
        });
        Ok(())
    }

    async fn send_password_changed_email(&self, to: &Email, _name: &str) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail::PasswordChanged {
            to: to.as_str().to_owned(),
        });
        Ok(())
    }
}

pub const PORTAL_URL: &str = "https://admin.folio.test";

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        tokens: TokenIssuer::new(
            &SecretString::from("unit-test-signing-key-5b7e1c9d3a8f2e6b4d0a".to_string()),
            Duration::hours(8),
        ),
        totp: TotpFactory::new("Folio Admin"),
        portal_url: PORTAL_URL.to_owned(),
        reset_token_ttl: Duration::minutes(60),
    }
}

pub fn auth_service(store: &MemoryStore, mailer: &RecordingMailer) -> AuthService {
    AuthService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(mailer.clone()),
        auth_settings(),
    )
}

/// Insert an active account with a real password hash.
pub async fn seed_admin(store: &MemoryStore, email: &str, password: &str, role: BuiltinRole) -> Admin {
    store
        .insert_admin(NewAdmin {
            email: Email::parse(email).unwrap(),
            name: format!("{} user", role.label()),
            password_hash: hash_password(password).await.unwrap(),
            role: role.label().to_owned(),
            permissions: role.permissions(),
            is_active: true,
            created_by: None,
        })
        .await
        .unwrap()
}
