use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::api::auth::authenticate_admin;
use crate::api::types::{AnimeDto, CommentDto};
use crate::db::{AnimeFilter, AnimeInput};

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct AnimeRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub genre: String,
    pub year: i32,
    #[serde(default = "default_episodes")]
    pub episodes: i32,
    #[serde(default)]
    pub thumbnail_url: String,
}

const fn default_episodes() -> i32 {
    1
}

impl From<AnimeRequest> for AnimeInput {
    fn from(req: AnimeRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            media_type: req.media_type,
            genre: req.genre,
            year: req.year,
            episodes: req.episodes,
            thumbnail_url: req.thumbnail_url,
        }
    }
}

/// GET /api/anime
/// Public catalog listing with optional type/genre/year/search filters.
pub async fn list_anime(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<AnimeDto>>, ApiError> {
    let filter = AnimeFilter {
        media_type: params.media_type,
        genre: params.genre,
        year: params.year,
        search: params.search,
    };

    let items = state.store.list_anime(&filter).await?;

    Ok(Json(items.into_iter().map(AnimeDto::from).collect()))
}

/// GET /api/anime/{id}
/// Public detail view including comments, newest first.
pub async fn get_anime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<AnimeDto>, ApiError> {
    let anime = state
        .store
        .get_anime(id)
        .await?
        .ok_or_else(|| ApiError::anime_not_found(id))?;

    let comments = state.store.list_comments_for_anime(id).await?;

    let mut dto = AnimeDto::from(anime);
    dto.comments = Some(comments.into_iter().map(CommentDto::from).collect());

    Ok(Json(dto))
}

/// POST /api/anime (admin)
pub async fn create_anime(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AnimeRequest>,
) -> Result<Json<AnimeDto>, ApiError> {
    let claims = authenticate_admin(&state, &headers).await?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::validation("Title is required"));
    }

    let anime = state
        .store
        .insert_anime(payload.into(), claims.user_id)
        .await?;

    tracing::info!("Anime {} created by user {}", anime.id, claims.user_id);

    Ok(Json(AnimeDto::from(anime)))
}

/// PUT /api/anime/{id} (admin)
pub async fn update_anime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(payload): Json<AnimeRequest>,
) -> Result<Json<AnimeDto>, ApiError> {
    authenticate_admin(&state, &headers).await?;

    let updated = state
        .store
        .update_anime(id, payload.into())
        .await?
        .ok_or_else(|| ApiError::anime_not_found(id))?;

    Ok(Json(AnimeDto::from(updated)))
}

/// DELETE /api/anime/{id} (admin)
pub async fn delete_anime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let claims = authenticate_admin(&state, &headers).await?;

    if !state.store.delete_anime(id).await? {
        return Err(ApiError::anime_not_found(id));
    }

    tracing::info!("Anime {} deleted by user {}", id, claims.user_id);

    Ok(Json(json!({ "success": true })))
}
