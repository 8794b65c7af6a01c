pub mod config;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde_json::json;

use ripple_api::auth::{self, AppState};
use ripple_api::middleware::require_auth;
use ripple_api::{pictures, posts, users};
use ripple_types::api::HealthResponse;

/// Upload limit plus headroom for multipart framing.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024 + 64 * 1024;

/// Assemble the full API router. CORS and request tracing are layered on
/// by the binary; tests drive this router directly.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route(
            "/api/auth/profile-picture/{user_id}",
            get(pictures::serve_profile_picture),
        )
        .route("/api/health", get(health))
        .with_state(state.clone());

    let protected = Router::new()
        .route(
            "/api/auth/profile",
            get(auth::get_profile).put(auth::update_profile),
        )
        .route(
            "/api/auth/profile-picture",
            post(pictures::upload_profile_picture),
        )
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route("/api/posts/{post_id}/like", post(posts::toggle_like))
        .route("/api/users/{username}", get(users::get_user_by_username))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(endpoint_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        timestamp: chrono::Utc::now(),
    })
}

async fn endpoint_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}
