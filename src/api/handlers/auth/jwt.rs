//! HS256 session tokens for access and refresh.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tokens are short-lived; refresh tokens mint new access tokens.
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 60 * 60;
pub const REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id.
    pub sub: String,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    #[must_use]
    pub fn new(user_id: Uuid, email: &str, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::seconds(ttl_seconds);

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

/// Sign claims with the configured secret (HS256).
///
/// # Errors
///
/// Returns an error if serialization or signing fails
pub fn sign(claims: &SessionClaims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and expiry, returning the embedded claims.
///
/// # Errors
///
/// Returns an error when the token is malformed, expired, or signed with a
/// different secret
pub fn verify(token: &str, secret: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_sign_verify_roundtrip() {
        let user_id = Uuid::new_v4();
        let claims = SessionClaims::new(user_id, "user@example.com", ACCESS_TOKEN_TTL_SECONDS);

        let token = sign(&claims, SECRET).unwrap();
        let verified = verify(&token, SECRET).unwrap();

        assert_eq!(verified.sub, user_id.to_string());
        assert_eq!(verified.email, "user@example.com");
        assert_eq!(verified.iat, claims.iat);
        assert_eq!(verified.exp, claims.exp);
        assert!(!verified.is_expired());
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let claims =
            SessionClaims::new(Uuid::new_v4(), "user@example.com", ACCESS_TOKEN_TTL_SECONDS);
        let token = sign(&claims, SECRET).unwrap();

        let result = verify(&token, "another-secret");
        assert!(matches!(
            result.unwrap_err().kind(),
            ErrorKind::InvalidSignature
        ));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let claims = SessionClaims::new(Uuid::new_v4(), "user@example.com", -60);
        assert!(claims.is_expired());

        let token = sign(&claims, SECRET).unwrap();
        let result = verify(&token, SECRET);
        assert!(matches!(
            result.unwrap_err().kind(),
            ErrorKind::ExpiredSignature
        ));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(verify("not.a.jwt", SECRET).is_err());
        assert!(verify("", SECRET).is_err());
    }

    #[test]
    fn test_refresh_outlives_access() {
        assert!(REFRESH_TOKEN_TTL_SECONDS > ACCESS_TOKEN_TTL_SECONDS);
    }
}
