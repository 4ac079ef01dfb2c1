use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService, TokenService};

pub mod anime;
pub mod auth;
pub mod comments;
mod error;
pub mod ratings;
mod types;

pub use error::ApiError;
pub use types::*;

/// Read-only after startup: configuration, pooled store, and the auth
/// orchestrator. Request handling itself is stateless.
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth: Arc<dyn AuthService>,
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    config.validate()?;

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tokens = Arc::new(TokenService::new(
        &config.security.jwt_secret,
        config.security.token_ttl_days,
    ));

    let auth = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        tokens,
        config.security.clone(),
    )) as Arc<dyn AuthService>;

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        auth,
    }))
}

/// GET /api/health
/// Liveness probe: round-trips the database pool.
async fn health(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    state.store.ping().await?;

    Ok(Json(json!({ "status": "ok" })))
}

pub fn router(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/health", get(health))
        .route(
            "/auth",
            post(auth::authenticate_user).get(auth::verify_session),
        )
        .route("/auth/password", post(auth::change_password))
        .route("/anime", get(anime::list_anime).post(anime::create_anime))
        .route(
            "/anime/{id}",
            get(anime::get_anime)
                .put(anime::update_anime)
                .delete(anime::delete_anime),
        )
        .route("/anime/{id}/comments", get(comments::list_comments))
        .route("/comments", post(comments::post_comment))
        .route("/ratings", post(ratings::submit_rating))
        .with_state(state);

    // Permissive CORS: the frontend is served from a different origin and
    // preflight must answer 200.
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}
