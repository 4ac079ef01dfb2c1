//! `SeaORM` implementation of the `AuthService` trait: the per-request
//! orchestrator composing the password policy, lockout guard, token service
//! and audit log.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::user::{hash_password, verify_password};
use crate::entities::users;
use crate::services::auth_service::{
    AuthError, AuthOutcome, AuthService, PublicUser, RequestContext,
};
use crate::services::password_policy;
use crate::services::token_service::{Claims, TokenService};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

const MAX_EMAIL_LEN: usize = 255;

/// Lowercase + trim; the stored email is always the normalized form.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_is_valid(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

/// Minutes left on a lock, or `None` when the account is not locked.
/// Sub-minute remainders report 1, never 0. An unparsable timestamp counts
/// as unlocked rather than bricking the account.
fn lock_remaining_minutes(locked_until: Option<&str>, now: DateTime<Utc>) -> Option<i64> {
    let until = locked_until?;
    let until = DateTime::parse_from_rfc3339(until).ok()?.with_timezone(&Utc);

    if until > now {
        Some((until - now).num_minutes().max(1))
    } else {
        None
    }
}

pub struct SeaOrmAuthService {
    store: Store,
    tokens: Arc<TokenService>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, tokens: Arc<TokenService>, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }

    /// Best-effort audit write; a failed log line never fails the request.
    async fn audit(
        &self,
        user_id: Option<i32>,
        action: &str,
        success: bool,
        ctx: &RequestContext,
        details: &str,
    ) {
        if let Err(e) = self
            .store
            .log_security_event(user_id, action, success, &ctx.ip, &ctx.user_agent, details)
            .await
        {
            tracing::warn!("Failed to write security log for {action}: {e}");
        }
    }

    fn outcome(&self, user: &users::Model) -> Result<AuthOutcome, AuthError> {
        let token = self.tokens.issue(user)?;
        Ok(AuthOutcome {
            token,
            user: PublicUser::from(user),
        })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        email: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<AuthOutcome, AuthError> {
        let email = normalize_email(email);

        if !email_is_valid(&email) {
            self.audit(None, "register_invalid_email", false, ctx, &email)
                .await;
            return Err(AuthError::InvalidEmail);
        }

        if let Err(reason) = password_policy::validate(password) {
            self.audit(None, "register_weak_password", false, ctx, &email)
                .await;
            return Err(AuthError::PolicyViolation(reason));
        }

        if self.store.get_user_by_email(&email).await?.is_some() {
            self.audit(None, "register_duplicate", false, ctx, &email)
                .await;
            return Err(AuthError::DuplicateAccount);
        }

        let password_hash = hash_password(password, &self.security).await?;
        let user = self.store.insert_user(&email, &password_hash).await?;

        self.audit(Some(user.id), "register_success", true, ctx, "")
            .await;
        tracing::info!("Registered new account: {email}");

        self.outcome(&user)
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<AuthOutcome, AuthError> {
        let email = normalize_email(email);

        if !email_is_valid(&email) {
            self.audit(None, "login_invalid_email", false, ctx, &email)
                .await;
            return Err(AuthError::InvalidEmail);
        }

        let user = self.store.get_user_by_email(&email).await?;

        // Lock check first: a correct password during the lock window still
        // gets refused.
        if let Some(user) = &user
            && let Some(remaining_minutes) =
                lock_remaining_minutes(user.account_locked_until.as_deref(), Utc::now())
        {
            self.audit(Some(user.id), "login_locked", false, ctx, &email)
                .await;
            return Err(AuthError::AccountLocked { remaining_minutes });
        }

        let Some(user) = user else {
            self.audit(None, "login_user_not_found", false, ctx, &email)
                .await;
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            self.audit(Some(user.id), "login_inactive", false, ctx, "")
                .await;
            return Err(AuthError::AccountInactive);
        }

        if !verify_password(&user.password_hash, password).await? {
            let attempts = self
                .store
                .record_login_failure(
                    &email,
                    self.security.lockout.max_attempts,
                    self.security.lockout.lockout_minutes,
                )
                .await?;
            self.audit(
                Some(user.id),
                "login_wrong_password",
                false,
                ctx,
                &format!("attempt {attempts}"),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        self.store.record_login_success(&email).await?;
        self.audit(Some(user.id), "login_success", true, ctx, "")
            .await;

        self.outcome(&user)
    }

    async fn verify(&self, token: &str, ctx: &RequestContext) -> Result<Claims, AuthError> {
        let claims = self.tokens.verify(token)?;

        // Claims are trusted as of issuance, but the active flag is re-read
        // so deactivation takes effect before the token expires.
        let user = self.store.get_user_by_id(claims.user_id).await?;

        match user {
            Some(user) if user.is_active => Ok(claims),
            _ => {
                self.audit(Some(claims.user_id), "verify_inactive", false, ctx, "")
                    .await;
                Err(AuthError::AccountInactive)
            }
        }
    }

    async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let claims = self.tokens.verify(token)?;

        if old_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::MissingField);
        }

        if let Err(reason) = password_policy::validate(new_password) {
            return Err(AuthError::PolicyViolation(reason));
        }

        let Some(user) = self.store.get_user_by_id(claims.user_id).await? else {
            self.audit(
                Some(claims.user_id),
                "password_change_user_not_found",
                false,
                ctx,
                "",
            )
            .await;
            return Err(AuthError::NotFound);
        };

        if !user.is_active {
            self.audit(Some(user.id), "password_change_inactive", false, ctx, "")
                .await;
            return Err(AuthError::AccountInactive);
        }

        if !verify_password(&user.password_hash, old_password).await? {
            self.audit(
                Some(user.id),
                "password_change_wrong_old_password",
                false,
                ctx,
                "",
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        if old_password == new_password {
            return Err(AuthError::SamePassword);
        }

        let new_hash = hash_password(new_password, &self.security).await?;
        self.store
            .update_user_password_hash(user.id, &new_hash)
            .await?;

        self.audit(Some(user.id), "password_change_success", true, ctx, "")
            .await;
        tracing::info!("Password changed for user {}", user.id);

        Ok(())
    }
}
