use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use ripple_types::api::{Claims, UserEnvelope};

use crate::auth::{AppState, profile_from_row};
use crate::error::ApiError;

/// GET /api/users/{username} — public profile lookup, case-insensitive.
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username.to_lowercase())?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserEnvelope {
        user: profile_from_row(user),
    }))
}
