use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Public projection of a user. Email, password hash and the raw picture
/// blob never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAuthor {
    pub username: String,
    pub display_name: String,
    pub profile_picture: String,
}

/// A post as seen by one viewer. `is_liked` is computed per request
/// against the viewer's like rows and is never stored on the post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub author: PostAuthor,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub likes: i64,
    pub is_liked: bool,
}
