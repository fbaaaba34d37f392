//! Credential store: accounts keyed by a unique username.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::db::models::{timestamp_column, to_millis, Identity, User, UserSummary};
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str = "id, username, password_hash, description, status, joined_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        joined_at: timestamp_column(row, 5)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Insert a new account. The hash must already be computed; plaintext never reaches the store.
pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> AppResult<User> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, username, password_hash, joined_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, username, password_hash, to_millis(now)],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::BadRequest("Username already exists".into())
        } else {
            AppError::Database(e)
        }
    })?;

    find_by_username(conn, username)?
        .ok_or_else(|| AppError::Internal(format!("user {} vanished after insert", username)))
}

pub fn find_by_username(conn: &Connection, username: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            params![username],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_identity(conn: &Connection, username: &str) -> AppResult<Option<Identity>> {
    let identity = conn
        .query_row(
            "SELECT id, username FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok(Identity {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(identity)
}

/// Returns the stored status, or `None` if the account no longer exists.
pub fn update_status(conn: &Connection, user_id: &str, status: &str) -> AppResult<Option<String>> {
    let stored = conn
        .query_row(
            "UPDATE users SET status = ?1 WHERE id = ?2 RETURNING status",
            params![status, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stored)
}

pub fn update_description(
    conn: &Connection,
    user_id: &str,
    description: &str,
) -> AppResult<Option<String>> {
    let stored = conn
        .query_row(
            "UPDATE users SET description = ?1 WHERE id = ?2 RETURNING description",
            params![description, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stored)
}

/// Case-insensitive substring match on username, folding case with Unicode rules.
pub fn search(conn: &Connection, term: &str) -> AppResult<Vec<UserSummary>> {
    let mut stmt = conn.prepare(
        "SELECT username, joined_at, description FROM users \
         WHERE instr(unicode_lower(username), ?1) > 0 \
         ORDER BY username",
    )?;
    let users = stmt
        .query_map(params![term.to_lowercase()], |row| {
            Ok(UserSummary {
                username: row.get(0)?,
                joined_at: timestamp_column(row, 1)?,
                description: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}
