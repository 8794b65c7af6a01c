use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                    TEXT PRIMARY KEY,
            username              TEXT NOT NULL UNIQUE,
            email                 TEXT NOT NULL UNIQUE,
            password_hash         TEXT NOT NULL,
            display_name          TEXT NOT NULL,
            bio                   TEXT NOT NULL
                DEFAULT 'Hello! I just joined this amazing social platform.',
            profile_picture       TEXT NOT NULL
                DEFAULT 'https://images.unsplash.com/photo-1535268647677-300dbf3d78d1?w=150&h=150&fit=crop&crop=face',
            profile_picture_data  TEXT,
            followers_count       INTEGER NOT NULL DEFAULT 0,
            following_count       INTEGER NOT NULL DEFAULT 0,
            created_at            TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            likes       INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at);

        -- UNIQUE(user_id, post_id) is the at-most-one-like-per-user-per-post
        -- invariant; the store enforces it, not just the application.
        CREATE TABLE IF NOT EXISTS post_likes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT NOT NULL REFERENCES posts(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, post_id)
        );

        CREATE INDEX IF NOT EXISTS idx_post_likes_post
            ON post_likes(post_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
