use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, QueryFilter, QueryOrder, Set};

use crate::entities::{comments, prelude::*, users};

/// A comment joined with its author's email for display.
#[derive(Debug, Clone)]
pub struct CommentWithAuthor {
    pub comment: comments::Model,
    pub email: String,
}

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Comments for one anime, newest first, with author emails.
    pub async fn list_for_anime(&self, anime_id: i32) -> Result<Vec<CommentWithAuthor>> {
        use sea_orm::EntityTrait;

        let rows = Comments::find()
            .filter(comments::Column::AnimeId.eq(anime_id))
            .order_by_desc(comments::Column::CreatedAt)
            .find_also_related(Users)
            .all(&self.conn)
            .await
            .context("Failed to list comments")?;

        let items = rows
            .into_iter()
            .map(|(comment, user)| CommentWithAuthor {
                comment,
                email: user.map(|u: users::Model| u.email).unwrap_or_default(),
            })
            .collect();

        Ok(items)
    }

    pub async fn insert(
        &self,
        anime_id: i32,
        user_id: i32,
        comment_text: &str,
    ) -> Result<comments::Model> {
        let active = comments::ActiveModel {
            anime_id: Set(anime_id),
            user_id: Set(user_id),
            comment_text: Set(comment_text.to_string()),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let comment = active
            .insert(&self.conn)
            .await
            .context("Failed to insert comment")?;

        Ok(comment)
    }
}
