//! Signed session and challenge tokens.
//!
//! Both token kinds are HS256 JWTs signed with the same key. Challenge tokens
//! carry `type = "2fa_temp"` and no permission claims, so they fail to decode
//! as session tokens and can never be replayed as one.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use folio_core::{AdminId, Permission};

use crate::models::Admin;

/// `type` claim carried by challenge tokens.
pub const CHALLENGE_TOKEN_TYPE: &str = "2fa_temp";

/// Lifetime of a challenge token, in seconds.
pub const CHALLENGE_TOKEN_TTL_SECS: i64 = 5 * 60;

/// Claims of a full session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: AdminId,
    pub email: String,
    pub role: String,
    pub permissions: Vec<Permission>,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a challenge token bridging password and 2FA verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeClaims {
    pub id: AdminId,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies tokens with one HMAC key.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"[REDACTED]")
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

/// Earliest issue time that survives the password-change cutoff.
#[must_use]
pub fn session_start(admin: &Admin, now: DateTime<Utc>) -> DateTime<Utc> {
    admin
        .password_changed_at
        .map_or(now, |changed| now.max(changed + Duration::seconds(1)))
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, session_ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            session_ttl,
        }
    }

    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Sign a session token for `admin`.
    ///
    /// `iat` has whole-second resolution, so a token issued in the same
    /// second as the last password change is dated one second past it.
    ///
    /// # Errors
    ///
    /// Returns `jsonwebtoken::errors::Error` if encoding fails.
    pub fn issue_session(&self, admin: &Admin) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_session_at(admin, session_start(admin, Utc::now()))
    }

    /// Sign a session token as if issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns `jsonwebtoken::errors::Error` if encoding fails.
    pub fn issue_session_at(
        &self,
        admin: &Admin,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            id: admin.id,
            email: admin.email.as_str().to_owned(),
            role: admin.role.clone(),
            permissions: admin.permissions.clone(),
            iat: now.timestamp(),
            exp: (now + self.session_ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Sign a five minute challenge token for `admin_id`.
    ///
    /// # Errors
    ///
    /// Returns `jsonwebtoken::errors::Error` if encoding fails.
    pub fn issue_challenge(&self, admin_id: AdminId) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_challenge_at(admin_id, Utc::now())
    }

    /// Sign a challenge token as if issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns `jsonwebtoken::errors::Error` if encoding fails.
    pub fn issue_challenge_at(
        &self,
        admin_id: AdminId,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = ChallengeClaims {
            id: admin_id,
            token_type: CHALLENGE_TOKEN_TYPE.to_owned(),
            iat: now.timestamp(),
            exp: now.timestamp() + CHALLENGE_TOKEN_TTL_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature and expiry of a session token.
    ///
    /// Stateless: the account is not consulted.
    ///
    /// # Errors
    ///
    /// Returns `jsonwebtoken::errors::Error` if the token is malformed,
    /// badly signed, expired or not a session token.
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation())
            .map(|data| data.claims)
    }

    /// Verify a challenge token and that it is bound to `admin_id`.
    ///
    /// Returns `None` when the token is valid but of the wrong type or for a
    /// different admin.
    ///
    /// # Errors
    ///
    /// Returns `jsonwebtoken::errors::Error` if the token is malformed,
    /// badly signed or expired.
    pub fn verify_challenge(
        &self,
        token: &str,
        admin_id: AdminId,
    ) -> Result<Option<ChallengeClaims>, jsonwebtoken::errors::Error> {
        let claims =
            jsonwebtoken::decode::<ChallengeClaims>(token, &self.decoding, &validation())?.claims;

        if claims.token_type != CHALLENGE_TOKEN_TYPE || claims.id != admin_id {
            return Ok(None);
        }
        Ok(Some(claims))
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::admin::fixtures::admin;
    use folio_core::BuiltinRole;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            &SecretString::from("k3y-for-unit-tests-9f8a7b6c5d4e3f2a1b0c".to_string()),
            Duration::hours(8),
        )
    }

    #[test]
    fn test_session_round_trip() {
        let issuer = issuer();
        let a = admin(7, "jane@folio.app", BuiltinRole::Moderator);

        let claims = issuer.verify_session(&issuer.issue_session(&a).unwrap()).unwrap();

        assert_eq!(claims.id, a.id);
        assert_eq!(claims.email, "jane@folio.app");
        assert_eq!(claims.role, "moderator");
        assert_eq!(claims.permissions, a.permissions);
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn test_session_dated_after_password_change() {
        let issuer = issuer();
        let mut a = admin(3, "a@x.com", BuiltinRole::Admin);
        let now = Utc::now();

        a.password_changed_at = Some(now);
        assert_eq!(session_start(&a, now), now + Duration::seconds(1));
        let claims = issuer.verify_session(&issuer.issue_session(&a).unwrap()).unwrap();
        assert!(claims.iat > now.timestamp());

        a.password_changed_at = Some(now - Duration::hours(1));
        assert_eq!(session_start(&a, now), now);
    }

    #[test]
    fn test_expired_session_rejected() {
        let issuer = issuer();
        let a = admin(1, "a@x.com", BuiltinRole::Viewer);
        let token = issuer
            .issue_session_at(&a, Utc::now() - Duration::hours(9))
            .unwrap();

        assert!(issuer.verify_session(&token).is_err());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let a = admin(1, "a@x.com", BuiltinRole::Viewer);
        let token = issuer().issue_session(&a).unwrap();
        let other = TokenIssuer::new(
            &SecretString::from("another-key-entirely-0a1b2c3d4e5f6a7b8c".to_string()),
            Duration::hours(8),
        );

        assert!(other.verify_session(&token).is_err());
    }

    #[test]
    fn test_challenge_carries_type_and_admin() {
        let issuer = issuer();
        let token = issuer.issue_challenge(AdminId::new(3)).unwrap();

        let claims = issuer.verify_challenge(&token, AdminId::new(3)).unwrap().unwrap();
        assert_eq!(claims.token_type, "2fa_temp");
        assert_eq!(claims.exp - claims.iat, 300);

        assert!(issuer.verify_challenge(&token, AdminId::new(4)).unwrap().is_none());
    }

    #[test]
    fn test_challenge_expires_after_five_minutes() {
        let issuer = issuer();
        let token = issuer
            .issue_challenge_at(AdminId::new(3), Utc::now() - Duration::minutes(6))
            .unwrap();

        assert!(issuer.verify_challenge(&token, AdminId::new(3)).is_err());
    }

    #[test]
    fn test_tokens_do_not_cross_over() {
        let issuer = issuer();
        let a = admin(3, "a@x.com", BuiltinRole::Admin);

        let challenge = issuer.issue_challenge(a.id).unwrap();
        assert!(issuer.verify_session(&challenge).is_err());

        let session = issuer.issue_session(&a).unwrap();
        assert!(issuer.verify_challenge(&session, a.id).is_err());
    }
}
