/// Database row types — these map directly to SQLite rows.
/// Distinct from the ripple-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub profile_picture_data: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: String,
}

/// Feed row with the author columns joined in.
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub author_username: String,
    pub author_display_name: String,
    pub author_profile_picture: String,
    pub content: String,
    pub likes: i64,
    pub created_at: String,
}
