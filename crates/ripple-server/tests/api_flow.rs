//! End-to-end flows through the real router: register → post → like →
//! unlike, profile management, and the profile-picture round trip.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use ripple_api::auth::{AppState, AppStateInner};
use ripple_db::Database;
use ripple_server::build_router;

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret".into(),
    });
    build_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, path: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn bare_request(method: &str, path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Returns (access_token, user_id).
async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "secret123",
                "displayName": username,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn create_post(app: &Router, token: &str, content: &str) -> String {
    let (status, body) = send(
        app,
        json_request("POST", "/api/posts", Some(token), &json!({ "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create post failed: {body}");
    body["post"]["id"].as_str().unwrap().to_string()
}

fn multipart_request(token: &str, filename: &str, mime: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "ripple-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/auth/profile-picture")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([180, 40, 40]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn register_post_like_unlike_scenario() {
    let app = app();
    let (token, _) = register(&app, "alice").await;

    let post_id = create_post(&app, &token, "hello world").await;
    let like_path = format!("/api/posts/{post_id}/like");

    let (status, body) = send(&app, bare_request("POST", &like_path, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], 1);
    assert_eq!(body["isLiked"], true);

    let (status, body) = send(&app, bare_request("POST", &like_path, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], 0);
    assert_eq!(body["isLiked"], false);

    let (status, body) = send(&app, bare_request("GET", "/api/posts", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"], "hello world");
    assert_eq!(posts[0]["likes"], 0);
    assert_eq!(posts[0]["isLiked"], false);
    assert_eq!(posts[0]["author"]["username"], "alice");
}

#[tokio::test]
async fn duplicate_username_conflicts_regardless_of_case() {
    let app = app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({
                "username": "ALICE",
                "email": "different@example.com",
                "password": "secret123",
                "displayName": "Other Alice",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already exists");
}

#[tokio::test]
async fn register_rejects_missing_and_blank_fields() {
    let app = app();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({ "username": "bob", "password": "x", "displayName": "Bob" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email is required");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({
                "username": "   ",
                "email": "bob@example.com",
                "password": "x",
                "displayName": "Bob",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "username is required");
}

#[tokio::test]
async fn login_accepts_email_and_keeps_failures_generic() {
    let app = app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "username": "alice@example.com", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["access_token"].as_str().is_some());

    // Wrong password and unknown user are indistinguishable
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "username": "alice", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "username": "nobody", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, _) = send(
        &app,
        json_request("POST", "/api/auth/login", None, &json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feed_flags_are_viewer_relative() {
    let app = app();
    let (alice, _) = register(&app, "alice").await;
    let (bob, _) = register(&app, "bob").await;

    create_post(&app, &alice, "first").await;
    let second = create_post(&app, &alice, "second").await;

    let like_path = format!("/api/posts/{second}/like");
    send(&app, bare_request("POST", &like_path, Some(&alice))).await;
    send(&app, bare_request("POST", &like_path, Some(&bob))).await;

    let (_, body) = send(&app, bare_request("GET", "/api/posts", Some(&alice))).await;
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    let second_for_alice = posts
        .iter()
        .find(|p| p["content"] == "second")
        .unwrap();
    assert_eq!(second_for_alice["likes"], 2);
    assert_eq!(second_for_alice["isLiked"], true);
    let first_for_alice = posts.iter().find(|p| p["content"] == "first").unwrap();
    assert_eq!(first_for_alice["isLiked"], false);

    // Bob un-likes; his flag flips while Alice's stays
    send(&app, bare_request("POST", &like_path, Some(&bob))).await;

    let (_, body) = send(&app, bare_request("GET", "/api/posts", Some(&bob))).await;
    let second_for_bob = body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["content"] == "second")
        .unwrap()
        .clone();
    assert_eq!(second_for_bob["likes"], 1);
    assert_eq!(second_for_bob["isLiked"], false);

    let (_, body) = send(&app, bare_request("GET", "/api/posts", Some(&alice))).await;
    let second_for_alice = body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["content"] == "second")
        .unwrap()
        .clone();
    assert_eq!(second_for_alice["isLiked"], true);
}

#[tokio::test]
async fn empty_post_content_rejected() {
    let app = app();
    let (token, _) = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/posts", Some(&token), &json!({ "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Content is required");
}

#[tokio::test]
async fn liking_a_missing_post_is_not_found() {
    let app = app();
    let (token, _) = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        bare_request("POST", "/api/posts/no-such-post/like", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");
}

#[tokio::test]
async fn profile_update_is_partial() {
    let app = app();
    let (token, _) = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            &json!({ "bio": "gone surfing" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["bio"], "gone surfing");
    assert_eq!(body["user"]["displayName"], "alice");

    let (status, body) = send(&app, bare_request("GET", "/api/auth/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["bio"], "gone surfing");
}

#[tokio::test]
async fn user_lookup_is_case_insensitive() {
    let app = app();
    let (token, _) = register(&app, "alice").await;

    let (status, body) = send(&app, bare_request("GET", "/api/users/ALICE", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");

    let (status, body) = send(&app, bare_request("GET", "/api/users/nobody", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn profile_picture_upload_normalizes_and_serves() {
    let app = app();
    let (token, user_id) = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        multipart_request(&token, "avatar.png", "image/png", &png_bytes(500, 400)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "upload failed: {body}");
    assert_eq!(
        body["user"]["profilePicture"],
        format!("/api/auth/profile-picture/{user_id}")
    );

    // Serving is public — no token
    let response = app
        .clone()
        .oneshot(bare_request(
            "GET",
            &format!("/api/auth/profile-picture/{user_id}"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let served = image::load_from_memory(&bytes).unwrap();
    // 500x400 fits into 300x300 as 300x240, aspect preserved
    assert_eq!((served.width(), served.height()), (300, 240));
}

#[tokio::test]
async fn disallowed_extension_rejected_before_storage() {
    let app = app();
    let (token, user_id) = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        multipart_request(&token, "notes.txt", "text/plain", b"not an image"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File type not allowed");

    // Nothing was stored
    let (status, _) = send(
        &app,
        bare_request("GET", &format!("/api/auth/profile-picture/{user_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app();

    let (status, _) = send(&app, bare_request("GET", "/api/posts", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, bare_request("GET", "/api/posts", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let app = app();

    let (status, body) = send(&app, bare_request("GET", "/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].as_str().is_some());

    let (status, body) = send(&app, bare_request("GET", "/api/definitely-not-a-route", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint not found");
}
