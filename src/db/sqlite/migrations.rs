//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_users", CREATE_USERS_TABLE)?;
    run_migration(conn, "002_sessions", CREATE_SESSIONS_TABLE)?;
    run_migration(conn, "003_institutions", CREATE_INSTITUTIONS_TABLE)?;
    run_migration(conn, "004_links", CREATE_LINKS_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Bearer sessions, stored by token digest; expires_at is unix seconds
const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE sessions (
    token_hash TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    expires_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
"#;

/// JSON columns hold serialized arrays/objects as TEXT
const CREATE_INSTITUTIONS_TABLE: &str = r#"
CREATE TABLE institutions (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    code TEXT,
    display_name TEXT,
    institution_type TEXT,
    country_code TEXT,
    country_codes TEXT,
    website TEXT,
    primary_color TEXT,
    logo TEXT,
    icon_logo TEXT,
    text_logo TEXT,
    form_fields TEXT,
    features TEXT,
    integration_type TEXT,
    status TEXT,
    resources TEXT,
    openbanking_information TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Several rows may exist per institution; the newest one is current
const CREATE_LINKS_TABLE: &str = r#"
CREATE TABLE links (
    id TEXT PRIMARY KEY,
    institution TEXT NOT NULL,
    status TEXT NOT NULL,
    fetch_resources TEXT NOT NULL DEFAULT '[]',
    access_mode TEXT,
    credentials_encrypted TEXT,
    credentials_nonce TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_links_institution ON links(institution);
"#;
