//! Issues and verifies the signed session tokens that carry user identity.
//!
//! Tokens are self-contained HS256 JWTs; expiry is the only termination
//! mechanism, there is no server-side revocation.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::users;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Malformed,
}

/// Identity fields embedded in a session token. Trusted as of issuance;
/// callers that need the live account state re-query the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub email: String,
    pub role: String,
    pub is_admin: bool,
    pub exp: i64,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::days(ttl_days),
        }
    }

    /// Sign a token for this user, expiring after the configured TTL.
    pub fn issue(&self, user: &users::Model) -> anyhow::Result<String> {
        self.issue_with_expiry(user, (Utc::now() + self.ttl).timestamp())
    }

    fn issue_with_expiry(&self, user: &users::Model, exp: i64) -> anyhow::Result<String> {
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            is_admin: user.is_admin,
            exp,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to sign token: {e}"))
    }

    /// Decode and validate a token, returning the embedded claims unmodified.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> users::Model {
        let now = Utc::now().to_rfc3339();
        users::Model {
            id: 7,
            email: "viewer@example.com".to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role: "user".to_string(),
            is_admin: false,
            is_active: true,
            failed_login_attempts: 0,
            account_locked_until: None,
            last_failed_login: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn issue_then_verify_returns_same_claims() {
        let service = TokenService::new("unit-test-secret", 30);
        let user = sample_user();

        let token = service.issue(&user).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, user.role);
        assert_eq!(claims.is_admin, user.is_admin);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let service = TokenService::new("unit-test-secret", 30);
        let user = sample_user();

        // Correctly signed, but the embedded expiration is in the past
        let token = service
            .issue_with_expiry(&user, (Utc::now() - Duration::hours(1)).timestamp())
            .unwrap();

        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_is_malformed() {
        let service = TokenService::new("unit-test-secret", 30);
        let token = service.issue(&sample_user()).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert_eq!(service.verify(&tampered), Err(TokenError::Malformed));

        assert_eq!(
            service.verify("not-even-a-jwt"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_malformed() {
        let issuer = TokenService::new("secret-a", 30);
        let verifier = TokenService::new("secret-b", 30);

        let token = issuer.issue(&sample_user()).unwrap();
        assert_eq!(verifier.verify(&token), Err(TokenError::Malformed));
    }
}
