use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::{prelude::*, security_logs};

/// Append-only writer for the security audit trail. Callers are expected to
/// treat failures as non-fatal; the primary request must not abort because a
/// log row could not be written.
pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(
        &self,
        user_id: Option<i32>,
        action: &str,
        success: bool,
        ip_address: &str,
        user_agent: &str,
        details: &str,
    ) -> Result<()> {
        let active = security_logs::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            success: Set(success),
            ip_address: Set(ip_address.to_string()),
            user_agent: Set(user_agent.to_string()),
            details: Set(details.to_string()),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };

        SecurityLogs::insert(active)
            .exec(&self.conn)
            .await
            .context("Failed to write security log")?;

        Ok(())
    }

    /// Recent events for one account, newest first. Used by forensic review.
    pub async fn recent_for_user(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<security_logs::Model>> {
        use sea_orm::QuerySelect;

        let rows = SecurityLogs::find()
            .filter(security_logs::Column::UserId.eq(user_id))
            .order_by_desc(security_logs::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query security logs")?;

        Ok(rows)
    }
}
