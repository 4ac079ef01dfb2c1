use serde::Serialize;

use crate::db::CommentWithAuthor;
use crate::entities::anime;
use crate::services::PublicUser;

/// Wire shape for register/login success: the token plus public user fields.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AnimeDto {
    pub id: i32,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub genre: String,
    pub year: i32,
    pub episodes: i32,
    pub thumbnail_url: String,
    pub rating: Option<f64>,
    pub rating_count: i32,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentDto>>,
}

impl From<anime::Model> for AnimeDto {
    fn from(model: anime::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            media_type: model.media_type,
            genre: model.genre,
            year: model.year,
            episodes: model.episodes,
            thumbnail_url: model.thumbnail_url,
            rating: model.rating,
            rating_count: model.rating_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
            comments: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
    pub id: i32,
    pub comment_text: String,
    pub created_at: String,
    pub email: String,
}

impl From<CommentWithAuthor> for CommentDto {
    fn from(row: CommentWithAuthor) -> Self {
        Self {
            id: row.comment.id,
            comment_text: row.comment.comment_text,
            created_at: row.comment.created_at,
            email: row.email,
        }
    }
}

/// Aggregate returned after a rating is submitted.
#[derive(Debug, Serialize)]
pub struct RatingSummary {
    pub rating: f64,
    pub rating_count: i32,
}
