//! Domain service for authentication and account security.
//!
//! Handles registration, login with lockout, token verification, and
//! password changes. The single implementation behind this trait replaces
//! what used to be duplicated per-endpoint handler logic.

use serde::Serialize;
use thiserror::Error;

use crate::entities::users;
use crate::services::token_service::{Claims, TokenError};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password strength rejection; carries the first violated rule.
    #[error("{0}")]
    PolicyViolation(&'static str),

    #[error("Email is already registered")]
    DuplicateAccount,

    /// Deliberately identical for unknown accounts and wrong passwords, so
    /// the response does not leak account existence.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account locked. Try again in {remaining_minutes} minutes")]
    AccountLocked { remaining_minutes: i64 },

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenMalformed,

    #[error("Both old and new passwords are required")]
    MissingField,

    #[error("New password must be different from the old one")]
    SamePassword,

    #[error("User not found")]
    NotFound,

    /// The only transient kind; everything else is terminal per request.
    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Malformed => Self::TokenMalformed,
        }
    }
}

/// Public user fields returned to clients; never carries the hash.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i32,
    pub email: String,
    pub role: String,
    pub is_admin: bool,
}

impl From<&users::Model> for PublicUser {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Successful register/login result.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub token: String,
    pub user: PublicUser,
}

/// Caller metadata recorded with every audit event.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub ip: String,
    pub user_agent: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account and signs the first session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`], [`AuthError::PolicyViolation`] or
    /// [`AuthError::DuplicateAccount`]; each rejection is audited.
    async fn register(
        &self,
        email: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<AuthOutcome, AuthError>;

    /// Verifies credentials, enforcing the failed-login lockout.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountLocked`] while the lock window is open,
    /// [`AuthError::AccountInactive`] for deactivated accounts, and
    /// [`AuthError::InvalidCredentials`] otherwise on failure.
    async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<AuthOutcome, AuthError>;

    /// Decodes a session token and re-checks that the account is still active.
    async fn verify(&self, token: &str, ctx: &RequestContext) -> Result<Claims, AuthError>;

    /// Changes the password after verifying the token and the old password.
    ///
    /// # Errors
    ///
    /// Propagates token failures unchanged; returns [`AuthError::SamePassword`]
    /// when old and new are equal even if both satisfy the policy.
    async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError>;
}
