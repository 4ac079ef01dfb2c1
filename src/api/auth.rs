use axum::{Json, extract::State, http::HeaderMap};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::api::types::{AuthResponse, MessageResponse};
use crate::services::{Claims, RequestContext};

// ============================================================================
// Request types
// ============================================================================

#[derive(Deserialize)]
pub struct AuthRequest {
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

fn default_action() -> String {
    "login".to_string()
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

// ============================================================================
// Helpers
// ============================================================================

/// Caller metadata for the audit trail. Proxy-forwarded IP first value,
/// "unknown" when absent (mirrors the gateway the frontend talks through).
pub fn request_context(headers: &HeaderMap) -> RequestContext {
    let ip = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let user_agent = headers
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string());

    RequestContext { ip, user_agent }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Auth-Token")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Decode the `X-Auth-Token` header and re-check the account is active.
/// Shared by every handler that gates on a session.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = extract_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let ctx = request_context(headers);
    let claims = state.auth.verify(&token, &ctx).await?;
    Ok(claims)
}

/// As [`authenticate`], additionally requiring the admin flag.
/// `is_admin` is the canonical check; `role` is display-only.
pub async fn authenticate_admin(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let claims = authenticate(state, headers).await?;

    if !claims.is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(claims)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth
/// `{action: "register"|"login", email, password}` -> token + public user
pub async fn authenticate_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let ctx = request_context(&headers);

    let outcome = match payload.action.as_str() {
        "register" => {
            state
                .auth
                .register(&payload.email, &payload.password, &ctx)
                .await?
        }
        "login" => {
            state
                .auth
                .login(&payload.email, &payload.password, &ctx)
                .await?
        }
        other => {
            return Err(ApiError::validation(format!("Unknown action: {other}")));
        }
    };

    Ok(Json(AuthResponse {
        token: outcome.token,
        user: outcome.user,
    }))
}

/// GET /api/auth
/// Verify the session token from `X-Auth-Token` and echo its claims.
pub async fn verify_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let claims = authenticate(&state, &headers).await?;

    Ok(Json(json!({ "user": claims })))
}

/// POST /api/auth/password
/// Change password; requires the current password and a valid session.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = extract_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let ctx = request_context(&headers);

    state
        .auth
        .change_password(&token, &payload.old_password, &payload.new_password, &ctx)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}
