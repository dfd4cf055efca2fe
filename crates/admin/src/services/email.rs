//! Email delivery for account notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates. Services
//! depend on the [`Mailer`] trait so tests can record messages instead.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use folio_core::Email;

use crate::config::EmailConfig;

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
    expires_in_minutes: i64,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    reset_url: &'a str,
    expires_in_minutes: i64,
}

/// HTML template for the password changed notice.
#[derive(Template)]
#[template(path = "email/password_changed.html")]
struct PasswordChangedEmailHtml<'a> {
    name: &'a str,
}

/// Plain text template for the password changed notice.
#[derive(Template)]
#[template(path = "email/password_changed.txt")]
struct PasswordChangedEmailText<'a> {
    name: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Outbound notifications sent by the auth service.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the link that lets an admin choose a new password.
    async fn send_password_reset_email(
        &self,
        to: &Email,
        name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError>;

    /// Tell an admin their password has changed.
    async fn send_password_changed_email(&self, to: &Email, name: &str) -> Result<(), EmailError>;
}

/// SMTP mailer for transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    reset_token_ttl_minutes: i64,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, reset_token_ttl_minutes: i64) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            reset_token_ttl_minutes,
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_password_reset_email(
        &self,
        to: &Email,
        name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        let expires_in_minutes = self.reset_token_ttl_minutes;
        let html = PasswordResetEmailHtml {
            name,
            reset_url,
            expires_in_minutes,
        }
        .render()?;
        let text = PasswordResetEmailText {
            name,
            reset_url,
            expires_in_minutes,
        }
        .render()?;

        self.send_multipart_email(to.as_str(), "Reset your Folio Admin password", &text, &html)
            .await
    }

    async fn send_password_changed_email(&self, to: &Email, name: &str) -> Result<(), EmailError> {
        let html = PasswordChangedEmailHtml { name }.render()?;
        let text = PasswordChangedEmailText { name }.render()?;

        self.send_multipart_email(
            to.as_str(),
            "Your Folio Admin password was changed",
            &text,
            &html,
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_templates_include_link_and_expiry() {
        let url = "https://admin.folio.app/reset-password/abc123";
        let html = PasswordResetEmailHtml {
            name: "Jane",
            reset_url: url,
            expires_in_minutes: 60,
        }
        .render()
        .unwrap();
        let text = PasswordResetEmailText {
            name: "Jane",
            reset_url: url,
            expires_in_minutes: 60,
        }
        .render()
        .unwrap();

        for body in [&html, &text] {
            assert!(body.contains("Jane"));
            assert!(body.contains("abc123"));
            assert!(body.contains("60 minutes"));
        }
        assert!(text.contains(url));
    }

    #[test]
    fn test_html_template_escapes_name() {
        let html = PasswordChangedEmailHtml {
            name: "<script>",
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>"));
    }
}
