use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use ripple_types::api::{Claims, CreatePostRequest, CreatePostResponse, FeedResponse, LikeResponse};
use ripple_types::models::{PostAuthor, PostView};

use crate::auth::AppState;
use crate::error::ApiError;

/// GET /api/posts — the whole feed, newest first, annotated with the
/// caller's like state. The flag is resolved per request; nothing
/// viewer-specific is stored on the post rows.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking DB work off the async runtime
    let db = state.clone();
    let viewer_id = claims.sub.to_string();

    let (rows, liked) = tokio::task::spawn_blocking(move || {
        let rows = db.db.get_posts()?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let liked = db.db.get_liked_post_ids(&viewer_id, &ids)?;
        Ok::<_, anyhow::Error>((rows, liked))
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    let posts: Vec<PostView> = rows
        .into_iter()
        .map(|row| {
            let is_liked = liked.contains(&row.id);
            let timestamp = parse_sqlite_timestamp(&row.created_at, &row.id);

            PostView {
                id: row.id.parse().unwrap_or_else(|e| {
                    warn!("Corrupt post id '{}': {}", row.id, e);
                    Uuid::default()
                }),
                author: PostAuthor {
                    username: row.author_username,
                    display_name: row.author_display_name,
                    profile_picture: row.author_profile_picture,
                },
                content: row.content,
                timestamp,
                likes: row.likes,
                is_liked,
            }
        })
        .collect();

    Ok(Json(FeedResponse { posts }))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.as_deref().unwrap_or("").trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("Content is required".into()));
    }

    let post_id = Uuid::new_v4();

    let db = state.clone();
    let author_id = claims.sub.to_string();
    let body = content.clone();
    let author_row = tokio::task::spawn_blocking(move || {
        db.db.insert_post(&post_id.to_string(), &author_id, &body)?;
        db.db.get_user_by_id(&author_id)
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    let author = match author_row {
        Some(user) => PostAuthor {
            username: user.username,
            display_name: user.display_name,
            profile_picture: user.profile_picture,
        },
        None => PostAuthor {
            username: "unknown".to_string(),
            display_name: "unknown".to_string(),
            profile_picture: String::new(),
        },
    };

    info!("User {} created post {}", claims.sub, post_id);

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Post created successfully".into(),
            post: PostView {
                id: post_id,
                author,
                content,
                timestamp: Utc::now(),
                likes: 0,
                is_liked: false,
            },
        }),
    ))
}

/// POST /api/posts/{post_id}/like — like if not liked, unlike otherwise.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let like_id = Uuid::new_v4();

    let db = state.clone();
    let user_id = claims.sub.to_string();
    let target = post_id.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        db.db.toggle_like(&like_id.to_string(), &user_id, &target)
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    let (likes, is_liked) =
        outcome.ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    info!(
        "User {} {} post {}",
        claims.sub,
        if is_liked { "liked" } else { "unliked" },
        post_id
    );

    Ok(Json(LikeResponse {
        message: "Like toggled successfully".into(),
        likes,
        is_liked,
    }))
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC when RFC 3339 parsing fails.
fn parse_sqlite_timestamp(raw: &str, post_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on post '{}': {}", raw, post_id, e);
            DateTime::default()
        })
}
