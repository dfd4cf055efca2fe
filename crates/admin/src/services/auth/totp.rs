//! TOTP enrollment and verification.
//!
//! SHA-1, 6 digits, 30 second step, one step of skew either way. These are
//! the parameters every mainstream authenticator app assumes.

use rand::RngCore;
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP_SECS: u64 = 30;
const SECRET_BYTES: usize = 20;

/// Errors building a TOTP generator.
#[derive(Debug, Error)]
pub enum TotpError {
    /// Stored secret is not valid base32.
    #[error("invalid TOTP secret: {0}")]
    Secret(String),

    /// Secret, issuer or account name rejected by the generator.
    #[error("TOTP setup error: {0}")]
    Setup(String),

    /// QR rendering failed.
    #[error("QR code error: {0}")]
    Qr(String),
}

/// A freshly generated secret and the ways to hand it to an authenticator.
#[derive(Clone)]
pub struct TotpEnrollment {
    /// Base32 secret for manual entry.
    pub secret: String,
    pub otpauth_url: String,
    /// `data:image/png;base64,...`
    pub qr_code: String,
}

impl std::fmt::Debug for TotpEnrollment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpEnrollment")
            .field("secret", &"[REDACTED]")
            .field("otpauth_url", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Builds TOTP generators labelled with one issuer.
#[derive(Debug, Clone)]
pub struct TotpFactory {
    issuer: String,
}

impl TotpFactory {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Generate a new random secret for `account`.
    ///
    /// # Errors
    ///
    /// Returns `TotpError` if the generator or the QR code cannot be built.
    pub fn generate(&self, account: &str) -> Result<TotpEnrollment, TotpError> {
        let mut bytes = vec![0u8; SECRET_BYTES];
        rand::rng().fill_bytes(&mut bytes);

        let totp = self.build(bytes, account)?;
        let qr = totp.get_qr_base64().map_err(TotpError::Qr)?;

        Ok(TotpEnrollment {
            secret: totp.get_secret_base32(),
            otpauth_url: totp.get_url(),
            qr_code: format!("data:image/png;base64,{qr}"),
        })
    }

    /// Check `code` against `secret` at the current time.
    ///
    /// # Errors
    ///
    /// Returns `TotpError::Secret` if the stored secret cannot be decoded.
    pub fn verify(&self, secret: &str, code: &str) -> Result<bool, TotpError> {
        self.verify_at(secret, code, unix_now())
    }

    /// Check `code` against `secret` at `time` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `TotpError::Secret` if the stored secret cannot be decoded.
    pub fn verify_at(&self, secret: &str, code: &str, time: u64) -> Result<bool, TotpError> {
        let code = code.trim();
        if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(false);
        }
        Ok(self.from_secret(secret)?.check(code, time))
    }

    /// The code `secret` produces at `time`.
    ///
    /// # Errors
    ///
    /// Returns `TotpError::Secret` if the stored secret cannot be decoded.
    pub fn code_at(&self, secret: &str, time: u64) -> Result<String, TotpError> {
        Ok(self.from_secret(secret)?.generate(time))
    }

    fn from_secret(&self, secret: &str) -> Result<TOTP, TotpError> {
        let bytes = Secret::Encoded(secret.to_owned())
            .to_bytes()
            .map_err(|e| TotpError::Secret(format!("{e:?}")))?;
        // The account label is irrelevant for checking codes.
        self.build(bytes, "admin")
    }

    fn build(&self, secret: Vec<u8>, account: &str) -> Result<TOTP, TotpError> {
        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP_SECS,
            secret,
            Some(self.issuer.clone()),
            account.to_owned(),
        )
        .map_err(|e| TotpError::Setup(e.to_string()))
    }
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn factory() -> TotpFactory {
        TotpFactory::new("Folio Admin")
    }

    #[test]
    fn test_enrollment_shape() {
        let enrollment = factory().generate("jane@folio.app").unwrap();

        assert_eq!(enrollment.secret.len(), 32);
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(enrollment.otpauth_url.contains("issuer=Folio%20Admin"));
        assert!(enrollment.qr_code.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_secrets_are_random() {
        let a = factory().generate("a@x.com").unwrap();
        let b = factory().generate("a@x.com").unwrap();
        assert_ne!(a.secret, b.secret);
    }

    #[test]
    fn test_verify_tolerates_one_step() {
        let f = factory();
        let secret = f.generate("a@x.com").unwrap().secret;
        let now = 1_700_000_000;

        let code = f.code_at(&secret, now).unwrap();
        assert!(f.verify_at(&secret, &code, now).unwrap());
        assert!(f.verify_at(&secret, &code, now + STEP_SECS).unwrap());
        assert!(f.verify_at(&secret, &code, now - STEP_SECS).unwrap());
        assert!(!f.verify_at(&secret, &code, now + 3 * STEP_SECS).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_codes() {
        let f = factory();
        let secret = f.generate("a@x.com").unwrap().secret;

        assert!(!f.verify(&secret, "").unwrap());
        assert!(!f.verify(&secret, "12345").unwrap());
        assert!(!f.verify(&secret, "abcdef").unwrap());
    }

    #[test]
    fn test_bad_secret_is_an_error() {
        assert!(matches!(
            factory().verify("not base32!", "123456"),
            Err(TotpError::Secret(_))
        ));
    }
}
