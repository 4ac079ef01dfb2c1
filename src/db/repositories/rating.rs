use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{prelude::*, ratings};

pub struct RatingRepository {
    conn: DatabaseConnection,
}

impl RatingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert or replace this user's rating for an anime.
    pub async fn upsert(&self, anime_id: i32, user_id: i32, rating: i32) -> Result<()> {
        let active = ratings::ActiveModel {
            anime_id: Set(anime_id),
            user_id: Set(user_id),
            rating: Set(rating),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };

        Ratings::insert(active)
            .on_conflict(
                OnConflict::columns([ratings::Column::AnimeId, ratings::Column::UserId])
                    .update_columns([ratings::Column::Rating, ratings::Column::CreatedAt])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to upsert rating")?;

        Ok(())
    }

    /// Average (one decimal) and count across all ratings for an anime.
    pub async fn aggregate(&self, anime_id: i32) -> Result<(f64, i32)> {
        let rows = Ratings::find()
            .filter(ratings::Column::AnimeId.eq(anime_id))
            .all(&self.conn)
            .await
            .context("Failed to load ratings for aggregation")?;

        if rows.is_empty() {
            return Ok((0.0, 0));
        }

        let count = rows.len() as i32;
        let sum: i64 = rows.iter().map(|r| i64::from(r.rating)).sum();
        let avg = (sum as f64 / f64::from(count) * 10.0).round() / 10.0;

        Ok((avg, count))
    }
}
