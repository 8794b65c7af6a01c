use anyhow::{Context, anyhow};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use image::{DynamicImage, RgbImage, Rgb, RgbaImage, codecs::jpeg::JpegEncoder, imageops::FilterType};
use tracing::info;

use ripple_types::api::{Claims, ProfileUpdateResponse};

use crate::auth::{AppState, profile_from_row};
use crate::error::ApiError;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// 5 MB upload limit for profile pictures
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Normalized pictures fit within this square, aspect ratio preserved.
const MAX_DIMENSION: u32 = 300;

const JPEG_QUALITY: u8 = 85;

/// POST /api/auth/profile-picture — accepts a multipart `file` field,
/// normalizes it to a bounded JPEG and stores it as a base64 blob on the
/// user row. The profile then points at the retrieval endpoint.
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Invalid multipart payload".into()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("Invalid multipart payload".into()))?;
            file = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) = file.ok_or_else(|| ApiError::Validation("No file part".into()))?;
    if filename.is_empty() {
        return Err(ApiError::Validation("No selected file".into()));
    }
    if !allowed_file(&filename) {
        return Err(ApiError::Validation("File type not allowed".into()));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(ApiError::Validation("File exceeds maximum size of 5MB".into()));
    }

    let user_id = claims.sub.to_string();
    let endpoint = format!("/api/auth/profile-picture/{}", user_id);

    // Image codec work and the DB write both block; run off the async runtime.
    let db = state.clone();
    let uid = user_id.clone();
    let updated = tokio::task::spawn_blocking(move || {
        let jpeg = normalize_image(&data).context("Image normalization failed")?;
        let encoded = B64.encode(&jpeg);
        if !db.db.set_profile_picture(&uid, &encoded, &endpoint)? {
            return Ok(None);
        }
        db.db.get_user_by_id(&uid)
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    let user = updated.ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!("User {} uploaded a profile picture ({})", user_id, filename);

    Ok(Json(ProfileUpdateResponse {
        message: "Profile picture uploaded successfully".into(),
        user: profile_from_row(user),
    }))
}

/// GET /api/auth/profile-picture/{user_id} — serve the stored blob.
/// Public: profile pictures are referenced by URL from other users' feeds.
pub async fn serve_profile_picture(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let blob = state
        .db
        .get_profile_picture_data(&user_id)?
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;

    // Older rows may carry a data-URI header; strip it before decoding.
    let (content_type, payload) = split_data_uri(&blob);
    let bytes = B64
        .decode(payload.trim())
        .map_err(|e| anyhow!("Corrupt picture blob for user {}: {}", user_id, e))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        bytes,
    ))
}

fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode, flatten any alpha channel onto white, force 3-channel RGB,
/// bound to 300px on the longer side (never upscaling), re-encode as
/// quality-85 JPEG.
fn normalize_image(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;

    let rgb: RgbImage = if img.color().has_alpha() {
        flatten_onto_white(&img.to_rgba8())
    } else {
        img.to_rgb8()
    };

    let rgb = if rgb.width() > MAX_DIMENSION || rgb.height() > MAX_DIMENSION {
        DynamicImage::ImageRgb8(rgb)
            .resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
            .to_rgb8()
    } else {
        rgb
    };

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder.encode_image(&rgb)?;
    Ok(out)
}

/// Composite onto an opaque white background, using alpha as the mask.
fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Split an optional `data:<mime>;base64,` header off a stored blob.
fn split_data_uri(blob: &str) -> (&str, &str) {
    if let Some(rest) = blob.strip_prefix("data:") {
        if let Some((head, payload)) = rest.split_once(',') {
            let mime = head.strip_suffix(";base64").unwrap_or(head);
            let mime = if mime.is_empty() { "image/jpeg" } else { mime };
            return (mime, payload);
        }
    }
    ("image/jpeg", blob)
}
