use std::collections::HashSet;

use crate::Database;
use crate::models::{PostRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

impl Database {
    // -- Users --

    #[allow(clippy::too_many_arguments)]
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        display_name: &str,
        bio: &str,
        profile_picture: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password_hash, display_name, bio, profile_picture)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, username, email, password_hash, display_name, bio, profile_picture],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    /// Login lookup: the identifier may be a username or an email.
    pub fn get_user_by_username_or_email(&self, ident: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1 OR email = ?1", ident))
    }

    /// Partial profile update. `None` fields keep their prior value.
    /// Returns the updated row, or `None` if the user does not exist.
    pub fn update_profile(
        &self,
        id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET
                     display_name    = COALESCE(?2, display_name),
                     bio             = COALESCE(?3, bio),
                     profile_picture = COALESCE(?4, profile_picture)
                 WHERE id = ?1",
                rusqlite::params![id, display_name, bio, profile_picture],
            )?;
            query_user(conn, "id = ?1", id)
        })
    }

    /// Store the normalized picture blob and point the profile at the
    /// retrieval endpoint in one statement, overwriting any prior blob.
    /// Returns false if the user does not exist.
    pub fn set_profile_picture(&self, id: &str, data_base64: &str, url: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET profile_picture_data = ?2, profile_picture = ?3 WHERE id = ?1",
                rusqlite::params![id, data_base64, url],
            )?;
            Ok(changed > 0)
        })
    }

    /// `None` when the user is missing or has never uploaded a picture.
    pub fn get_profile_picture_data(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let data: Option<Option<String>> = conn
                .query_row(
                    "SELECT profile_picture_data FROM users WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(data.flatten())
        })
    }

    // -- Posts --

    pub fn insert_post(&self, id: &str, user_id: &str, content: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, user_id, content],
            )?;
            Ok(())
        })
    }

    /// The whole feed, newest first. Equal timestamps keep insertion order
    /// (SQLite's datetime() has one-second resolution, so ties are common).
    pub fn get_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.user_id, u.username, u.display_name, u.profile_picture,
                        p.content, p.likes, p.created_at
                 FROM posts p
                 LEFT JOIN users u ON p.user_id = u.id
                 ORDER BY p.created_at DESC, p.rowid ASC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(PostRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        author_username: row
                            .get::<_, Option<String>>(2)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        author_display_name: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        author_profile_picture: row
                            .get::<_, Option<String>>(4)?
                            .unwrap_or_default(),
                        content: row.get(5)?,
                        likes: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Likes --

    /// Toggle a like inside one transaction: the counter and the relation
    /// row always commit or roll back together. Returns `None` if the post
    /// does not exist, otherwise `(new_like_count, is_liked)`.
    pub fn toggle_like(
        &self,
        like_id: &str,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<(i64, bool)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let post: Option<String> = tx
                .query_row("SELECT id FROM posts WHERE id = ?1", [post_id], |row| {
                    row.get(0)
                })
                .optional()?;
            if post.is_none() {
                return Ok(None);
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM post_likes WHERE user_id = ?1 AND post_id = ?2",
                    [user_id, post_id],
                    |row| row.get(0),
                )
                .optional()?;

            let is_liked = if let Some(existing_id) = existing {
                tx.execute("DELETE FROM post_likes WHERE id = ?1", [&existing_id])?;
                // Floored at zero so counter drift can never go negative.
                tx.execute(
                    "UPDATE posts SET likes = MAX(likes - 1, 0) WHERE id = ?1",
                    [post_id],
                )?;
                false
            } else {
                // The UNIQUE(user_id, post_id) constraint backstops this
                // insert if another writer raced us here.
                tx.execute(
                    "INSERT INTO post_likes (id, user_id, post_id) VALUES (?1, ?2, ?3)",
                    [like_id, user_id, post_id],
                )?;
                tx.execute("UPDATE posts SET likes = likes + 1 WHERE id = ?1", [post_id])?;
                true
            };

            let likes: i64 =
                tx.query_row("SELECT likes FROM posts WHERE id = ?1", [post_id], |row| {
                    row.get(0)
                })?;

            tx.commit()?;
            Ok(Some((likes, is_liked)))
        })
    }

    /// Batch-resolve which of the given posts the viewer has liked.
    pub fn get_liked_post_ids(&self, user_id: &str, post_ids: &[String]) -> Result<HashSet<String>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (2..=post_ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id FROM post_likes WHERE user_id = ?1 AND post_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
            params.extend(post_ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));

            let ids = stmt
                .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;

            Ok(ids)
        })
    }

    // -- Administration --

    /// Delete everything, children first so foreign keys hold throughout.
    /// Returns (likes, posts, users) deleted.
    pub fn purge_all(&self) -> Result<(usize, usize, usize)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let likes = tx.execute("DELETE FROM post_likes", [])?;
            let posts = tx.execute("DELETE FROM posts", [])?;
            let users = tx.execute("DELETE FROM users", [])?;

            tx.commit()?;
            info!("Purged {} likes, {} posts, {} users", likes, posts, users);
            Ok((likes, posts, users))
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, param: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password_hash, display_name, bio, profile_picture,
                profile_picture_data, followers_count, following_count, created_at
         FROM users WHERE {}",
        predicate
    );

    let row = conn
        .query_row(&sql, [param], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password_hash: row.get(3)?,
                display_name: row.get(4)?,
                bio: row.get(5)?,
                profile_picture: row.get(6)?,
                profile_picture_data: row.get(7)?,
                followers_count: row.get(8)?,
                following_count: row.get(9)?,
                created_at: row.get(10)?,
            })
        })
        .optional()?;

    Ok(row)
}
