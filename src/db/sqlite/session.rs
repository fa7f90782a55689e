//! Bearer session storage
//!
//! Only the SHA-256 digest of a token is stored; the token itself is shown to
//! the client once.

use crate::db::sqlite::models::User;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Store a session for `user_id`, dropping any expired ones
pub fn create_session(
    conn: &Connection,
    token_hash: &str,
    user_id: i64,
    expires_at: i64,
    now: i64,
) -> Result<()> {
    let purged = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
    if purged > 0 {
        tracing::debug!("Purged {} expired sessions", purged);
    }

    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![token_hash, user_id, expires_at],
    )?;

    Ok(())
}

/// Resolve an unexpired session to its user
pub fn get_session_user(conn: &Connection, token_hash: &str, now: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT u.id, u.username, u.created_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            params![token_hash, now],
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

/// Delete every session of a user, returns how many were removed
pub fn delete_user_sessions(conn: &Connection, user_id: i64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
    Ok(removed)
}
