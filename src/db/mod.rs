use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::anime::{AnimeFilter, AnimeInput};
pub use repositories::comment::CommentWithAuthor;

use crate::entities::{anime, comments, security_logs, users};

/// Facade over the per-table repositories sharing one pooled connection.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Each pooled connection to an in-memory SQLite gets its own database,
        // so in-memory runs are pinned to a single connection.
        let max_connections = if db_url.contains(":memory:") {
            1
        } else {
            max_connections
        };

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections.min(max_connections))
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn anime_repo(&self) -> repositories::anime::AnimeRepository {
        repositories::anime::AnimeRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    fn rating_repo(&self) -> repositories::rating::RatingRepository {
        repositories::rating::RatingRepository::new(self.conn.clone())
    }

    fn audit_repo(&self) -> repositories::audit::AuditRepository {
        repositories::audit::AuditRepository::new(self.conn.clone())
    }

    // ------------------------------------------------------------------
    // Users & lockout
    // ------------------------------------------------------------------

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn insert_user(&self, email: &str, password_hash: &str) -> Result<users::Model> {
        self.user_repo().insert(email, password_hash).await
    }

    pub async fn record_login_failure(
        &self,
        email: &str,
        max_attempts: i32,
        lockout_minutes: i64,
    ) -> Result<i32> {
        self.user_repo()
            .record_failure(email, max_attempts, lockout_minutes)
            .await
    }

    pub async fn record_login_success(&self, email: &str) -> Result<()> {
        self.user_repo().record_success(email).await
    }

    pub async fn update_user_password_hash(&self, id: i32, new_hash: &str) -> Result<()> {
        self.user_repo().update_password_hash(id, new_hash).await
    }

    // ------------------------------------------------------------------
    // Security audit log
    // ------------------------------------------------------------------

    pub async fn log_security_event(
        &self,
        user_id: Option<i32>,
        action: &str,
        success: bool,
        ip_address: &str,
        user_agent: &str,
        details: &str,
    ) -> Result<()> {
        self.audit_repo()
            .record(user_id, action, success, ip_address, user_agent, details)
            .await
    }

    pub async fn recent_security_events(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<security_logs::Model>> {
        self.audit_repo().recent_for_user(user_id, limit).await
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub async fn list_anime(&self, filter: &AnimeFilter) -> Result<Vec<anime::Model>> {
        self.anime_repo().list(filter).await
    }

    pub async fn get_anime(&self, id: i32) -> Result<Option<anime::Model>> {
        self.anime_repo().get(id).await
    }

    pub async fn insert_anime(&self, input: AnimeInput, created_by: i32) -> Result<anime::Model> {
        self.anime_repo().insert(input, created_by).await
    }

    pub async fn update_anime(&self, id: i32, input: AnimeInput) -> Result<Option<anime::Model>> {
        self.anime_repo().update(id, input).await
    }

    pub async fn delete_anime(&self, id: i32) -> Result<bool> {
        self.anime_repo().delete(id).await
    }

    // ------------------------------------------------------------------
    // Comments & ratings
    // ------------------------------------------------------------------

    pub async fn list_comments_for_anime(&self, anime_id: i32) -> Result<Vec<CommentWithAuthor>> {
        self.comment_repo().list_for_anime(anime_id).await
    }

    pub async fn insert_comment(
        &self,
        anime_id: i32,
        user_id: i32,
        comment_text: &str,
    ) -> Result<comments::Model> {
        self.comment_repo()
            .insert(anime_id, user_id, comment_text)
            .await
    }

    /// Upsert one user's rating, then recompute and store the aggregate.
    /// Returns the new (average, count), or `None` when the anime is gone.
    pub async fn submit_rating(
        &self,
        anime_id: i32,
        user_id: i32,
        rating: i32,
    ) -> Result<Option<(f64, i32)>> {
        self.rating_repo().upsert(anime_id, user_id, rating).await?;
        let (avg, count) = self.rating_repo().aggregate(anime_id).await?;
        self.anime_repo().set_rating(anime_id, avg, count).await
    }
}
