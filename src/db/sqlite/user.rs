//! User management

use crate::db::sqlite::models::User;
use crate::error::{AppError, Result};
use crate::security::SecurityManager;
use rusqlite::{params, Connection, OptionalExtension};

/// Verify user credentials
pub fn verify_user(
    conn: &Connection,
    username: &str,
    password: &str,
    security: &SecurityManager,
) -> Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
            [username],
            |row| {
                Ok((
                    User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        created_at: row.get(3)?,
                    },
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((user, password_hash)) if security.verify_password(password, &password_hash)? => {
            Ok(Some(user))
        }
        _ => Ok(None),
    }
}

/// Create a new user; the username must be unused
pub fn create_user(
    conn: &Connection,
    username: &str,
    password: &str,
    security: &SecurityManager,
) -> Result<User> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        params![username],
        |row| row.get(0),
    )?;

    if exists {
        return Err(AppError::Validation("Username already registered".to_string()));
    }

    let password_hash = security.hash_password(password)?;

    conn.execute(
        "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
        params![username, password_hash],
    )?;

    let id = conn.last_insert_rowid();

    get_user_by_id(conn, id)?
        .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", id)))
}

/// Get user by ID
pub fn get_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, created_at FROM users WHERE id = ?",
            [id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;

    Ok(user)
}
