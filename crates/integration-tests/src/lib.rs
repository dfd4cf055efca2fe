//! Integration tests for the Folio admin API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p folio-integration-tests
//! ```
//!
//! Tests drive the real router in-process with `tower::ServiceExt::oneshot`
//! over an in-memory store and a mailer that records instead of sending, so
//! no database or SMTP server is needed.
//!
//! # Test Categories
//!
//! - `auth_flows` - Login, 2FA, password reset and token revocation
//! - `admin_management` - Account CRUD, permissions and last-super-admin protection
//! - `roles` - Built-in role seeding

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use folio_admin::db::MemoryStore;
use folio_admin::models::{Admin, CreateAdmin};
use folio_admin::routes;
use folio_admin::services::auth::{TokenIssuer, TotpFactory};
use folio_admin::services::{AuthSettings, EmailError, Mailer};
use folio_admin::state::AppState;
use folio_core::Email;

pub const PORTAL_URL: &str = "https://admin.folio.test";
pub const JWT_SECRET: &str = "integration-signing-key-0f3b8e2a7c1d9e4f6a5b";
pub const PASSWORD: &str = "Sturdy-Passw0rd";

/// A message the API tried to send.
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

    /// Token from the most recent reset link sent to `to`.
    pub fn last_reset_token(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|mail| match mail {
            SentEmail::PasswordReset { to: addr, reset_url } if addr == to => reset_url
                .rsplit('/')
                .next()
                .map(str::to_owned),
            _ => None,
        })
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

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        tokens: TokenIssuer::new(&SecretString::from(JWT_SECRET.to_string()), Duration::hours(8)),
        totp: TotpFactory::new("Folio Admin"),
        portal_url: PORTAL_URL.to_owned(),
        reset_token_ttl: Duration::minutes(60),
    }
}

/// A JSON response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// App wired to in-memory infrastructure.
pub struct TestContext {
    pub store: MemoryStore,
    pub mailer: RecordingMailer,
    pub state: AppState,
    app: Router,
}

impl TestContext {
    /// Build the app and seed the built-in roles.
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::default();
        let state = AppState::new(store.clone(), Arc::new(mailer.clone()), auth_settings());
        state.roles().initialize_default_roles().await.unwrap();
        let app = routes::router(state.clone());

        Self {
            store,
            mailer,
            state,
            app,
        }
    }

    /// Create an active account directly through the service layer.
    pub async fn create_admin(&self, email: &str, role: &str) -> Admin {
        self.state
            .admins()
            .create_admin(
                CreateAdmin {
                    email: email.to_owned(),
                    password: PASSWORD.to_owned(),
                    name: format!("{role} account"),
                    role: Some(role.to_owned()),
                    is_active: Some(true),
                },
                None,
            )
            .await
            .unwrap()
    }

    /// Send a request through the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Log in with the shared test password and return the session token.
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["token"].as_str().unwrap().to_owned()
    }
}
