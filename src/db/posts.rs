//! Post store. Every mutation is filtered by `author_id` in the same statement,
//! so a non-owner sees exactly what a missing post looks like.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{timestamp_column, to_millis, Identity, NewPost, Post};
use crate::error::{AppError, AppResult};

const POST_SELECT: &str = "SELECT p.id, p.content, u.username, p.image, p.created_at, p.updated_at \
     FROM posts p JOIN users u ON u.id = p.author_id";

// Newest first; among equal timestamps the later insertion wins.
const NEWEST_FIRST: &str = "ORDER BY p.created_at DESC, p.seq DESC";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        content: row.get(1)?,
        author: row.get(2)?,
        image: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
        updated_at: timestamp_column(row, 5)?,
    })
}

/// Row returned by `RETURNING id, content, image, created_at, updated_at`; the author is the actor.
fn owned_post_from_row(row: &Row<'_>, author: &Identity) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        content: row.get(1)?,
        author: author.username.clone(),
        image: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
        updated_at: timestamp_column(row, 4)?,
    })
}

pub fn create_post(
    conn: &Connection,
    author: &Identity,
    post: &NewPost,
    now: DateTime<Utc>,
) -> AppResult<Post> {
    let id = uuid::Uuid::now_v7().to_string();
    let ts = to_millis(now);
    let created = conn.query_row(
        "INSERT INTO posts (id, author_id, content, image, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
         RETURNING id, content, image, created_at, updated_at",
        params![id, author.id, post.content(), post.image(), ts],
        |row| owned_post_from_row(row, author),
    )?;
    Ok(created)
}

pub fn find_post(conn: &Connection, post_id: &str) -> AppResult<Option<Post>> {
    let post = conn
        .query_row(
            &format!("{} WHERE p.id = ?1", POST_SELECT),
            params![post_id],
            post_from_row,
        )
        .optional()?;
    Ok(post)
}

pub fn list_all(conn: &Connection) -> AppResult<Vec<Post>> {
    let mut stmt = conn.prepare(&format!("{} {}", POST_SELECT, NEWEST_FIRST))?;
    let posts = stmt
        .query_map([], post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn list_by_author(conn: &Connection, author_id: &str) -> AppResult<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.author_id = ?1 {}",
        POST_SELECT, NEWEST_FIRST
    ))?;
    let posts = stmt
        .query_map(params![author_id], post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Replace the content of a post owned by `actor` and refresh `updated_at`.
///
/// Returns `Ok(None)` when the post is missing or belongs to someone else. Clearing
/// the content of an image-less post is a validation error, reported only to the owner.
pub fn update_content(
    conn: &Connection,
    post_id: &str,
    actor: &Identity,
    content: &str,
    now: DateTime<Utc>,
) -> AppResult<Option<Post>> {
    let blank = content.trim().is_empty();
    let updated = conn
        .query_row(
            "UPDATE posts SET content = ?1, updated_at = ?2 \
             WHERE id = ?3 AND author_id = ?4 AND (?5 = 0 OR image IS NOT NULL) \
             RETURNING id, content, image, created_at, updated_at",
            params![content, to_millis(now), post_id, actor.id, blank],
            |row| owned_post_from_row(row, actor),
        )
        .optional()?;

    if updated.is_none() && blank {
        let owned = conn
            .query_row(
                "SELECT 1 FROM posts WHERE id = ?1 AND author_id = ?2",
                params![post_id, actor.id],
                |_| Ok(()),
            )
            .optional()?;
        if owned.is_some() {
            return Err(AppError::BadRequest(
                "Post must have content or an image".into(),
            ));
        }
    }

    Ok(updated)
}

/// Remove a post owned by `actor`, returning what was removed. Referenced images are left alone.
pub fn delete_post(conn: &Connection, post_id: &str, actor: &Identity) -> AppResult<Option<Post>> {
    let deleted = conn
        .query_row(
            "DELETE FROM posts WHERE id = ?1 AND author_id = ?2 \
             RETURNING id, content, image, created_at, updated_at",
            params![post_id, actor.id],
            |row| owned_post_from_row(row, actor),
        )
        .optional()?;
    Ok(deleted)
}
