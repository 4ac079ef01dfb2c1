use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use aniview::api::AppState;
use aniview::config::Config;

/// Admin account seeded by the initial migration
const ADMIN_EMAIL: &str = "admin@aniview.local";
const ADMIN_PASSWORD: &str = "Admin123!";

async fn spawn_state() -> Arc<AppState> {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.jwt_secret = "integration-test-secret".to_string();
    // Keep hashing cheap in tests
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    aniview::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state")
}

async fn spawn_app() -> Router {
    aniview::api::router(spawn_state().await)
}

/// Flip the active flag directly in the store; there is deliberately no
/// endpoint for deactivation.
async fn deactivate_user(state: &AppState, email: &str) {
    use aniview::entities::{prelude::Users, users};
    use sea_orm::sea_query::Expr;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    Users::update_many()
        .col_expr(users::Column::IsActive, Expr::value(false))
        .filter(users::Column::Email.eq(email))
        .exec(&state.store.conn)
        .await
        .expect("Failed to deactivate user");
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("X-Auth-Token", token);
    }

    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

async fn register(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/auth",
        None,
        Some(json!({ "action": "register", "email": email, "password": password })),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/auth",
        None,
        Some(json!({ "action": "login", "email": email, "password": password })),
    )
    .await
}

// ============================================================================
// Auth flows
// ============================================================================

#[tokio::test]
async fn register_login_and_verify_flow() {
    let app = spawn_app().await;

    let (status, body) = register(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["email"], "a@b.com");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["is_admin"], false);
    assert!(body["user"]["password_hash"].is_null());

    // The freshly issued token verifies and echoes the same identity
    let token = body["token"].as_str().unwrap().to_string();
    let (status, body) = send(&app, "GET", "/api/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@b.com");
    assert_eq!(body["user"]["is_admin"], false);

    // Logging in again with the same credentials also works
    let (status, body) = login(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn register_normalizes_email_case() {
    let app = spawn_app().await;

    let (status, body) = register(&app, "  MixedCase@Example.COM ", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "mixedcase@example.com");

    let (status, _) = login(&app, "mixedcase@example.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = spawn_app().await;

    let (status, _) = register(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);

    // Different password, same address
    let (status, body) = register(&app, "a@b.com", "Xyz789#$").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is already registered");
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = spawn_app().await;

    for email in ["not-an-email", "missing@tld", "@nobody.com"] {
        let (status, body) = register(&app, email, "Abcd123!").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {email}");
        assert_eq!(body["error"], "Invalid email address");
    }
}

#[tokio::test]
async fn weak_passwords_report_first_violated_rule() {
    let app = spawn_app().await;

    let cases = [
        ("Ab1!", "8 characters"),
        ("abcd123!", "uppercase"),
        ("ABCD123!", "lowercase"),
        ("Abcdefg!", "digit"),
        ("Abcd1234", "special"),
    ];

    for (password, expected) in cases {
        let (status, body) = register(&app, "weak@example.com", password).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {password}");
        let error = body["error"].as_str().unwrap();
        assert!(error.contains(expected), "{password}: got {error}");
    }
}

#[tokio::test]
async fn unknown_email_and_wrong_password_yield_identical_errors() {
    let app = spawn_app().await;

    let (status, _) = register(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);

    let (status_missing, body_missing) = login(&app, "ghost@b.com", "Abcd123!").await;
    let (status_wrong, body_wrong) = login(&app, "a@b.com", "Wrong123!").await;

    assert_eq!(status_missing, StatusCode::UNAUTHORIZED);
    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    // No account-existence leakage
    assert_eq!(body_missing["error"], body_wrong["error"]);
}

#[tokio::test]
async fn five_failures_lock_the_account() {
    let app = spawn_app().await;

    let (status, _) = register(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);

    for attempt in 1..=5 {
        let (status, _) = login(&app, "a@b.com", "Wrong123!").await;
        assert_eq!(
            status,
            StatusCode::UNAUTHORIZED,
            "attempt {attempt} should report bad credentials"
        );
    }

    // The lock is now set: even the correct password is refused
    let (status, body) = login(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("locked"), "got {error}");
    assert!(error.contains("minutes"), "got {error}");

    // And further wrong passwords report the lock, not credentials
    let (status, _) = login(&app, "a@b.com", "Wrong123!").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn successful_login_resets_failure_counter() {
    let app = spawn_app().await;

    let (status, _) = register(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);

    // Four failures stay under the threshold
    for _ in 0..4 {
        let (status, _) = login(&app, "a@b.com", "Wrong123!").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = login(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);

    // Counter is back at zero: four more failures still do not lock
    for _ in 0..4 {
        let (status, _) = login(&app, "a@b.com", "Wrong123!").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = login(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn verify_rejects_missing_and_malformed_tokens() {
    let app = spawn_app().await;

    let (status, _) = send(&app, "GET", "/api/auth", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/auth", Some("garbage-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn change_password_flow() {
    let app = spawn_app().await;

    let (status, body) = register(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    // Wrong old password
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/password",
        Some(&token),
        Some(json!({ "old_password": "Nope123!", "new_password": "Newpass1!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Same old and new, both policy-conforming
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/password",
        Some(&token),
        Some(json!({ "old_password": "Abcd123!", "new_password": "Abcd123!" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("different"));

    // Weak new password
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/password",
        Some(&token),
        Some(json!({ "old_password": "Abcd123!", "new_password": "weak" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing field
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/password",
        Some(&token),
        Some(json!({ "old_password": "Abcd123!", "new_password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Valid change
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/password",
        Some(&token),
        Some(json!({ "old_password": "Abcd123!", "new_password": "Newpass1!" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("updated"));

    // Old password no longer works, new one does
    let (status, _) = login(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, "a@b.com", "Newpass1!").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deactivated_account_is_refused_everywhere() {
    let state = spawn_state().await;
    let app = aniview::api::router(state.clone());

    let (status, body) = register(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    deactivate_user(&state, "a@b.com").await;

    // Login with the correct password
    let (status, body) = login(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Account is deactivated");

    // A token issued before deactivation no longer verifies
    let (status, body) = send(&app, "GET", "/api/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Account is deactivated");

    // Nor does it permit a password change
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/password",
        Some(&token),
        Some(json!({ "old_password": "Abcd123!", "new_password": "Newpass1!" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Account is deactivated");
}

#[tokio::test]
async fn auth_events_land_in_the_audit_trail() {
    let state = spawn_state().await;
    let app = aniview::api::router(state.clone());

    let (status, body) = register(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
    let user_id = body["user"]["id"].as_i64().unwrap() as i32;

    let (status, _) = login(&app, "a@b.com", "Wrong123!").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, "a@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);

    let events = state
        .store
        .recent_security_events(user_id, 10)
        .await
        .unwrap();

    let actions: Vec<&str> = events.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&"register_success"), "got {actions:?}");
    assert!(actions.contains(&"login_wrong_password"), "got {actions:?}");
    assert!(actions.contains(&"login_success"), "got {actions:?}");

    let failure = events
        .iter()
        .find(|e| e.action == "login_wrong_password")
        .unwrap();
    assert!(!failure.success);
    assert_eq!(failure.user_id, Some(user_id));
}

#[tokio::test]
async fn change_password_requires_a_token() {
    let app = spawn_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/password",
        None,
        Some(json!({ "old_password": "Abcd123!", "new_password": "Newpass1!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let app = spawn_app().await;

    let (status, _) = send(&app, "DELETE", "/api/auth", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ============================================================================
// Catalog, comments, ratings
// ============================================================================

async fn admin_token(app: &Router) -> String {
    let (status, body) = login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["is_admin"], true);
    body["token"].as_str().unwrap().to_string()
}

fn sample_anime() -> Value {
    json!({
        "title": "Frieren: Beyond Journey's End",
        "description": "An elf mage outlives her companions.",
        "type": "tv",
        "genre": "fantasy",
        "year": 2023,
        "episodes": 28,
        "thumbnail_url": "https://img.example.com/frieren.jpg"
    })
}

#[tokio::test]
async fn anime_writes_require_admin() {
    let app = spawn_app().await;

    // Anonymous
    let (status, _) = send(&app, "POST", "/api/anime", None, Some(sample_anime())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Regular registered user
    let (status, body) = register(&app, "viewer@b.com", "Abcd123!").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", "/api/anime", Some(&token), Some(sample_anime())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("Admin"));
}

#[tokio::test]
async fn anime_crud_round_trip() {
    let app = spawn_app().await;
    let token = admin_token(&app).await;

    // Create
    let (status, created) =
        send(&app, "POST", "/api/anime", Some(&token), Some(sample_anime())).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["type"], "tv");
    assert_eq!(created["rating_count"], 0);

    // Listed publicly
    let (status, list) = send(&app, "GET", "/api/anime", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Filters
    let (_, filtered) = send(&app, "GET", "/api/anime?genre=fantasy&year=2023", None, None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    let (_, filtered) = send(&app, "GET", "/api/anime?genre=mecha", None, None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 0);
    let (_, filtered) = send(&app, "GET", "/api/anime?search=Frieren", None, None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    let (_, filtered) = send(&app, "GET", "/api/anime?type=all", None, None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);

    // Update
    let mut update = sample_anime();
    update["episodes"] = json!(29);
    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/anime/{id}"),
        Some(&token),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["episodes"], 29);

    // Detail includes (empty) comments
    let (status, detail) = send(&app, "GET", &format!("/api/anime/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["comments"].as_array().unwrap().len(), 0);

    // Delete
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/anime/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, "GET", &format!("/api/anime/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_and_ratings_flow() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;

    let (_, created) = send(&app, "POST", "/api/anime", Some(&admin), Some(sample_anime())).await;
    let id = created["id"].as_i64().unwrap();

    let (_, body) = register(&app, "viewer@b.com", "Abcd123!").await;
    let viewer = body["token"].as_str().unwrap().to_string();

    // Anonymous comment rejected
    let (status, _) = send(
        &app,
        "POST",
        "/api/comments",
        None,
        Some(json!({ "anime_id": id, "comment_text": "great" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Post and list
    let (status, comment) = send(
        &app,
        "POST",
        "/api/comments",
        Some(&viewer),
        Some(json!({ "anime_id": id, "comment_text": "A quiet masterpiece." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["email"], "viewer@b.com");

    let (status, comments) = send(
        &app,
        "GET",
        &format!("/api/anime/{id}/comments"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments.as_array().unwrap().len(), 1);
    assert_eq!(comments[0]["comment_text"], "A quiet masterpiece.");

    // Out-of-range rating
    let (status, _) = send(
        &app,
        "POST",
        "/api/ratings",
        Some(&viewer),
        Some(json!({ "anime_id": id, "rating": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // First rating
    let (status, summary) = send(
        &app,
        "POST",
        "/api/ratings",
        Some(&viewer),
        Some(json!({ "anime_id": id, "rating": 8 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["rating"], 8.0);
    assert_eq!(summary["rating_count"], 1);

    // Re-rating replaces instead of adding a second row
    let (status, summary) = send(
        &app,
        "POST",
        "/api/ratings",
        Some(&viewer),
        Some(json!({ "anime_id": id, "rating": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["rating"], 10.0);
    assert_eq!(summary["rating_count"], 1);

    // A second voter moves the average
    let (_, body) = register(&app, "second@b.com", "Abcd123!").await;
    let second = body["token"].as_str().unwrap().to_string();
    let (status, summary) = send(
        &app,
        "POST",
        "/api/ratings",
        Some(&second),
        Some(json!({ "anime_id": id, "rating": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["rating"], 8.5);
    assert_eq!(summary["rating_count"], 2);

    // Aggregate is visible on the catalog row
    let (_, detail) = send(&app, "GET", &format!("/api/anime/{id}"), None, None).await;
    assert_eq!(detail["rating"], 8.5);
    assert_eq!(detail["rating_count"], 2);
}

#[tokio::test]
async fn rating_a_missing_anime_is_not_found() {
    let app = spawn_app().await;

    let (_, body) = register(&app, "viewer@b.com", "Abcd123!").await;
    let viewer = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/ratings",
        Some(&viewer),
        Some(json!({ "anime_id": 4242, "rating": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
