use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{anime, prelude::*};

/// Catalog filters; a missing value (or the "all" sentinel the frontend
/// sends) leaves that column unfiltered.
#[derive(Debug, Default, Clone)]
pub struct AnimeFilter {
    pub media_type: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnimeInput {
    pub title: String,
    pub description: String,
    pub media_type: String,
    pub genre: String,
    pub year: i32,
    pub episodes: i32,
    pub thumbnail_url: String,
}

pub struct AnimeRepository {
    conn: DatabaseConnection,
}

impl AnimeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// List catalog entries, newest first.
    pub async fn list(&self, filter: &AnimeFilter) -> Result<Vec<anime::Model>> {
        let mut query = Anime::find().order_by_desc(anime::Column::CreatedAt);

        if let Some(media_type) = filter.media_type.as_deref()
            && media_type != "all"
        {
            query = query.filter(anime::Column::MediaType.eq(media_type));
        }

        if let Some(genre) = filter.genre.as_deref()
            && genre != "all"
        {
            query = query.filter(anime::Column::Genre.eq(genre));
        }

        if let Some(year) = filter.year {
            query = query.filter(anime::Column::Year.eq(year));
        }

        if let Some(search) = filter.search.as_deref()
            && !search.is_empty()
        {
            query = query.filter(anime::Column::Title.contains(search));
        }

        let items = query
            .all(&self.conn)
            .await
            .context("Failed to list anime")?;

        Ok(items)
    }

    pub async fn get(&self, id: i32) -> Result<Option<anime::Model>> {
        let item = Anime::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query anime by ID")?;

        Ok(item)
    }

    pub async fn insert(&self, input: AnimeInput, created_by: i32) -> Result<anime::Model> {
        let now = Utc::now().to_rfc3339();

        let active = anime::ActiveModel {
            title: Set(input.title),
            description: Set(input.description),
            media_type: Set(input.media_type),
            genre: Set(input.genre),
            year: Set(input.year),
            episodes: Set(input.episodes),
            thumbnail_url: Set(input.thumbnail_url),
            rating: Set(None),
            rating_count: Set(0),
            created_by: Set(Some(created_by)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let item = active
            .insert(&self.conn)
            .await
            .context("Failed to insert anime")?;

        Ok(item)
    }

    /// Full-record update; returns `None` when the id does not exist.
    pub async fn update(&self, id: i32, input: AnimeInput) -> Result<Option<anime::Model>> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let now = Utc::now().to_rfc3339();

        let mut active: anime::ActiveModel = existing.into();
        active.title = Set(input.title);
        active.description = Set(input.description);
        active.media_type = Set(input.media_type);
        active.genre = Set(input.genre);
        active.year = Set(input.year);
        active.episodes = Set(input.episodes);
        active.thumbnail_url = Set(input.thumbnail_url);
        active.updated_at = Set(now);

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update anime")?;

        Ok(Some(updated))
    }

    /// Returns false when nothing was deleted.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Anime::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete anime")?;

        Ok(result.rows_affected > 0)
    }

    /// Store a recomputed rating aggregate on the catalog row.
    pub async fn set_rating(&self, id: i32, rating: f64, count: i32) -> Result<Option<(f64, i32)>> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: anime::ActiveModel = existing.into();
        active.rating = Set(Some(rating));
        active.rating_count = Set(count);

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update anime rating")?;

        Ok(Some((updated.rating.unwrap_or(0.0), updated.rating_count)))
    }
}
