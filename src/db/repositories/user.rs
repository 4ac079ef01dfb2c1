use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, Set, Statement,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{prelude::*, users};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by normalized email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user)
    }

    /// Insert a freshly registered user with zeroed lockout counters.
    pub async fn insert(&self, email: &str, password_hash: &str) -> Result<users::Model> {
        let now = Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set("user".to_string()),
            is_admin: Set(false),
            is_active: Set(true),
            failed_login_attempts: Set(0),
            account_locked_until: Set(None),
            last_failed_login: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let user = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(user)
    }

    /// Record a failed login attempt.
    ///
    /// One atomic UPDATE: the increment and the conditional lock are a single
    /// statement, so two concurrent failures cannot lose an update. The
    /// counter keeps rising while the account is locked, and every failure at
    /// or past the threshold refreshes the lock window.
    ///
    /// Returns the counter value after the increment.
    pub async fn record_failure(
        &self,
        email: &str,
        max_attempts: i32,
        lockout_minutes: i64,
    ) -> Result<i32> {
        let now = Utc::now();
        let locked_until = (now + Duration::minutes(lockout_minutes)).to_rfc3339();

        let stmt = Statement::from_sql_and_values(
            DbBackend::Sqlite,
            r"UPDATE users
              SET failed_login_attempts = failed_login_attempts + 1,
                  last_failed_login = ?,
                  account_locked_until = CASE
                      WHEN failed_login_attempts + 1 >= ? THEN ?
                      ELSE account_locked_until
                  END
              WHERE email = ?",
            [
                now.to_rfc3339().into(),
                max_attempts.into(),
                locked_until.into(),
                email.into(),
            ],
        );

        self.conn
            .execute(stmt)
            .await
            .context("Failed to record login failure")?;

        let user = self
            .get_by_email(email)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User disappeared while recording failure: {email}"))?;

        Ok(user.failed_login_attempts)
    }

    /// Reset the failure counter and clear any lock, unconditionally.
    pub async fn record_success(&self, email: &str) -> Result<()> {
        Users::update_many()
            .col_expr(users::Column::FailedLoginAttempts, Expr::value(0))
            .col_expr(
                users::Column::AccountLockedUntil,
                Expr::value(Option::<String>::None),
            )
            .filter(users::Column::Email.eq(email))
            .exec(&self.conn)
            .await
            .context("Failed to reset login failures")?;

        Ok(())
    }

    /// Replace the password hash and touch `updated_at`.
    pub async fn update_password_hash(&self, id: i32, new_hash: &str) -> Result<()> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let now = Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash.to_string());
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
/// Runs on a blocking thread because Argon2 is CPU- and memory-intensive.
pub async fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();

    task::spawn_blocking(move || hash_password_sync(&password, &config))
        .await
        .context("Password hashing task panicked")?
}

fn hash_password_sync(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash on a blocking thread.
pub async fn verify_password(stored_hash: &str, password: &str) -> Result<bool> {
    let stored_hash = stored_hash.to_string();
    let password = password.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        let argon2 = Argon2::default();
        Ok::<bool, anyhow::Error>(
            argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}
