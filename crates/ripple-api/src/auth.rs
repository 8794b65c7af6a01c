use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use ripple_db::{DEFAULT_BIO, DEFAULT_PROFILE_PICTURE, Database, models::UserRow};
use ripple_types::api::{
    AuthResponse, Claims, LoginRequest, ProfileUpdateResponse, RegisterRequest,
    UpdateProfileRequest, UserEnvelope,
};
use ripple_types::models::UserProfile;

use crate::error::ApiError;

/// Tokens expire a week after issue.
const TOKEN_TTL_DAYS: i64 = 7;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.as_deref().unwrap_or("").trim().to_lowercase();
    let email = req.email.as_deref().unwrap_or("").trim().to_lowercase();
    let password = req.password.as_deref().unwrap_or("");
    let display_name = req.display_name.as_deref().unwrap_or("").trim().to_string();

    if username.is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }
    if email.is_empty() {
        return Err(ApiError::Validation("email is required".into()));
    }
    if password.trim().is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }
    if display_name.is_empty() {
        return Err(ApiError::Validation("displayName is required".into()));
    }

    if state.db.get_user_by_username(&username)?.is_some() {
        return Err(ApiError::Conflict("Username already exists".into()));
    }
    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let password_hash = hash_password(password)?;
    let user_id = Uuid::new_v4();

    state.db.create_user(
        &user_id.to_string(),
        &username,
        &email,
        &password_hash,
        &display_name,
        req.bio.as_deref().unwrap_or(DEFAULT_BIO),
        req.profile_picture.as_deref().unwrap_or(DEFAULT_PROFILE_PICTURE),
    )?;

    let row = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| anyhow!("user {} missing right after insert", user_id))?;

    let token = create_token(&state.jwt_secret, user_id)?;
    info!("User {} registered", username);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".into(),
            user: profile_from_row(row),
            access_token: token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ident = req.username.as_deref().unwrap_or("").trim().to_lowercase();
    let password = req.password.as_deref().unwrap_or("");

    if ident.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Username/email and password are required".into(),
        ));
    }

    // Same generic error whether the lookup or the password failed.
    let user = state
        .db
        .get_user_by_username_or_email(&ident)?
        .ok_or_else(|| ApiError::Auth("Invalid credentials".into()))?;

    if !verify_password(&user.password_hash, password)? {
        return Err(ApiError::Auth("Invalid credentials".into()));
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow!("Corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id)?;
    info!("User {} logged in", user.username);

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        user: profile_from_row(user),
        access_token: token,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserEnvelope {
        user: profile_from_row(user),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let display_name = req.display_name.as_deref().map(str::trim);

    let user = state
        .db
        .update_profile(
            &claims.sub.to_string(),
            display_name,
            req.bio.as_deref(),
            req.profile_picture.as_deref(),
        )?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(ProfileUpdateResponse {
        message: "Profile updated successfully".into(),
        user: profile_from_row(user),
    }))
}

// -- Helpers shared across handler modules --

pub(crate) fn profile_from_row(row: UserRow) -> UserProfile {
    UserProfile {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user id '{}': {}", row.id, e);
            Uuid::default()
        }),
        username: row.username,
        display_name: row.display_name,
        bio: row.bio,
        profile_picture: row.profile_picture,
        followers_count: row.followers_count,
        following_count: row.following_count,
    }
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    // Argon2id with a per-user random salt
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(stored_hash: &str, password: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow!("Stored password hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub(crate) fn create_token(secret: &str, user_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
