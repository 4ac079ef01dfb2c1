use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::api::auth::authenticate;
use crate::api::types::CommentDto;

#[derive(Deserialize)]
pub struct PostCommentRequest {
    pub anime_id: i32,
    #[serde(default)]
    pub comment_text: String,
}

/// GET /api/anime/{id}/comments
/// Public; newest first, with author emails.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(anime_id): Path<i32>,
) -> Result<Json<Vec<CommentDto>>, ApiError> {
    let comments = state.store.list_comments_for_anime(anime_id).await?;

    Ok(Json(comments.into_iter().map(CommentDto::from).collect()))
}

/// POST /api/comments
/// Any authenticated user may comment.
pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<PostCommentRequest>,
) -> Result<Json<CommentDto>, ApiError> {
    let claims = authenticate(&state, &headers).await?;

    if payload.comment_text.trim().is_empty() {
        return Err(ApiError::validation("anime_id and comment_text required"));
    }

    if state.store.get_anime(payload.anime_id).await?.is_none() {
        return Err(ApiError::anime_not_found(payload.anime_id));
    }

    let comment = state
        .store
        .insert_comment(payload.anime_id, claims.user_id, &payload.comment_text)
        .await?;

    Ok(Json(CommentDto {
        id: comment.id,
        comment_text: comment.comment_text,
        created_at: comment.created_at,
        email: claims.email,
    }))
}
