//! Link storage
//!
//! Stale rows from earlier attempts may remain; the newest row of an
//! institution is its current link. Credentials are stored encrypted.

use crate::aggregator::types::Credentials;
use crate::db::sqlite::models::{LinkInfo, LinkStatus};
use crate::error::Result;
use crate::security::SecurityManager;
use rusqlite::{params, Connection, OptionalExtension};

const CURRENT_LINK_ROWID: &str =
    "SELECT rowid FROM links WHERE institution = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1";

/// Get the current link of an institution
pub fn get_current_link(conn: &Connection, institution: &str) -> Result<Option<LinkInfo>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT id, institution, status, fetch_resources, access_mode, created_at
                 FROM links WHERE rowid = ({})",
                CURRENT_LINK_ROWID
            ),
            params![institution],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, institution, status, fetch_resources, access_mode, created_at)) = row else {
        return Ok(None);
    };

    Ok(Some(LinkInfo {
        id,
        institution,
        status: LinkStatus::parse(&status),
        fetch_resources: serde_json::from_str(&fetch_resources).unwrap_or_default(),
        access_mode,
        created_at,
    }))
}

/// Update the institution's current link in place, or insert a new one
pub fn upsert_link(
    conn: &mut Connection,
    link: &LinkInfo,
    credentials: Option<&Credentials>,
    security: &SecurityManager,
) -> Result<()> {
    let fetch_resources = serde_json::to_string(&link.fetch_resources)?;

    let (encrypted, nonce) = match credentials {
        Some(credentials) => {
            let (encrypted, nonce) = security.encrypt(&serde_json::to_string(credentials)?)?;
            (Some(encrypted), Some(nonce))
        }
        None => (None, None),
    };

    let tx = conn.transaction()?;

    let current: Option<i64> = tx
        .query_row(CURRENT_LINK_ROWID, params![link.institution], |row| row.get(0))
        .optional()?;

    match current {
        Some(rowid) => {
            tx.execute(
                "UPDATE links SET
                    id = ?1, status = ?2, fetch_resources = ?3, access_mode = ?4,
                    credentials_encrypted = ?5, credentials_nonce = ?6,
                    created_at = ?7, updated_at = datetime('now')
                 WHERE rowid = ?8",
                params![
                    link.id,
                    link.status.as_str(),
                    fetch_resources,
                    link.access_mode,
                    encrypted,
                    nonce,
                    link.created_at,
                    rowid
                ],
            )?;
            tracing::info!("Updated link for '{}' -> {}", link.institution, link.id);
        }
        None => {
            tx.execute(
                "INSERT INTO links (
                    id, institution, status, fetch_resources, access_mode,
                    credentials_encrypted, credentials_nonce, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    link.id,
                    link.institution,
                    link.status.as_str(),
                    fetch_resources,
                    link.access_mode,
                    encrypted,
                    nonce,
                    link.created_at
                ],
            )?;
            tracing::info!("Stored new link for '{}' -> {}", link.institution, link.id);
        }
    }

    tx.commit()?;
    Ok(())
}

/// Decrypted credentials a link was registered with, if any were kept
pub fn get_link_credentials(
    conn: &Connection,
    link_id: &str,
    security: &SecurityManager,
) -> Result<Option<Credentials>> {
    let row = conn
        .query_row(
            "SELECT credentials_encrypted, credentials_nonce FROM links WHERE id = ?1",
            params![link_id],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
        )
        .optional()?;

    match row {
        Some((Some(encrypted), Some(nonce))) => {
            let plaintext = security.decrypt(&encrypted, &nonce)?;
            Ok(Some(serde_json::from_str(&plaintext)?))
        }
        _ => Ok(None),
    }
}

/// Number of link rows kept for an institution (current and stale)
#[cfg(test)]
pub fn count_links(conn: &Connection, institution: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM links WHERE institution = ?1",
        params![institution],
        |row| row.get(0),
    )?;
    Ok(count)
}
