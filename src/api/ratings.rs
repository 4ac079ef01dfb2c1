use axum::{Json, extract::State, http::HeaderMap};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::api::auth::authenticate;
use crate::api::types::RatingSummary;

#[derive(Deserialize)]
pub struct SubmitRatingRequest {
    pub anime_id: i32,
    pub rating: i32,
}

/// POST /api/ratings
/// Upserts the caller's 1-10 rating and returns the recomputed aggregate.
pub async fn submit_rating(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SubmitRatingRequest>,
) -> Result<Json<RatingSummary>, ApiError> {
    let claims = authenticate(&state, &headers).await?;

    if !(1..=10).contains(&payload.rating) {
        return Err(ApiError::validation("anime_id and rating (1-10) required"));
    }

    if state.store.get_anime(payload.anime_id).await?.is_none() {
        return Err(ApiError::anime_not_found(payload.anime_id));
    }

    let (rating, rating_count) = state
        .store
        .submit_rating(payload.anime_id, claims.user_id, payload.rating)
        .await?
        .ok_or_else(|| ApiError::anime_not_found(payload.anime_id))?;

    Ok(Json(RatingSummary {
        rating,
        rating_count,
    }))
}
