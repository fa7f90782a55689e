//! SQLite persistence store

pub mod models;
mod migrations;
mod user;
mod session;
mod institution;
mod link;

use crate::aggregator::types::Credentials;
use crate::error::Result;
use crate::security::SecurityManager;
use models::*;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper
///
/// Every method takes the connection lock for the duration of one call only,
/// so callers never hold it across an `.await`.
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Open (or create) the database file and run migrations
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn)
    }

    /// In-memory database (tests, throwaway runs)
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ========== User Methods ==========

    /// Verify user credentials
    pub fn verify_user(
        &self,
        username: &str,
        password: &str,
        security: &SecurityManager,
    ) -> Result<Option<User>> {
        let conn = self.conn.lock();
        user::verify_user(&conn, username, password, security)
    }

    /// Create a new user
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        security: &SecurityManager,
    ) -> Result<User> {
        let conn = self.conn.lock();
        user::create_user(&conn, username, password, security)
    }

    // ========== Session Methods ==========

    pub fn create_session(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: i64,
        now: i64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        session::create_session(&conn, token_hash, user_id, expires_at, now)
    }

    pub fn get_session_user(&self, token_hash: &str, now: i64) -> Result<Option<User>> {
        let conn = self.conn.lock();
        session::get_session_user(&conn, token_hash, now)
    }

    pub fn delete_user_sessions(&self, user_id: i64) -> Result<usize> {
        let conn = self.conn.lock();
        session::delete_user_sessions(&conn, user_id)
    }

    // ========== Institution Methods ==========

    pub fn upsert_institutions(&self, records: &[InstitutionRecord]) -> Result<usize> {
        let mut conn = self.conn.lock();
        institution::upsert_institutions(&mut conn, records)
    }

    pub fn get_institution_by_name(&self, name: &str) -> Result<Option<InstitutionRecord>> {
        let conn = self.conn.lock();
        institution::get_institution_by_name(&conn, name)
    }

    // ========== Link Methods ==========

    /// Current link of an institution (newest row)
    pub fn get_current_link(&self, institution: &str) -> Result<Option<LinkInfo>> {
        let conn = self.conn.lock();
        link::get_current_link(&conn, institution)
    }

    /// Update the current link of `link.institution` or insert a new one
    pub fn upsert_link(
        &self,
        link: &LinkInfo,
        credentials: Option<&Credentials>,
        security: &SecurityManager,
    ) -> Result<()> {
        let mut conn = self.conn.lock();
        link::upsert_link(&mut conn, link, credentials, security)
    }

    /// Credentials a link was registered with (decrypted)
    pub fn get_link_credentials(
        &self,
        link_id: &str,
        security: &SecurityManager,
    ) -> Result<Option<Credentials>> {
        let conn = self.conn.lock();
        link::get_link_credentials(&conn, link_id, security)
    }

    #[cfg(test)]
    pub fn count_links(&self, institution: &str) -> Result<i64> {
        let conn = self.conn.lock();
        link::count_links(&conn, institution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> (SqliteDb, SecurityManager) {
        (
            SqliteDb::open_in_memory().unwrap(),
            SecurityManager::ephemeral().unwrap(),
        )
    }

    fn link(id: &str, status: &str) -> LinkInfo {
        LinkInfo {
            id: id.into(),
            institution: "erebor_mx_retail".into(),
            status: LinkStatus::parse(status),
            fetch_resources: vec!["ACCOUNTS".into()],
            access_mode: None,
            created_at: "2024-05-01T10:00:00Z".into(),
        }
    }

    #[test]
    fn test_create_and_verify_user() {
        let (db, security) = setup();

        let user = db.create_user("alice", "password123", &security).unwrap();
        assert!(user.id > 0);
        assert_eq!(user.username, "alice");

        let verified = db.verify_user("alice", "password123", &security).unwrap();
        assert_eq!(verified.map(|u| u.id), Some(user.id));

        assert!(db.verify_user("alice", "nope", &security).unwrap().is_none());
        assert!(db.verify_user("bob", "password123", &security).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (db, security) = setup();
        db.create_user("alice", "password123", &security).unwrap();

        let result = db.create_user("alice", "other-password", &security);
        assert!(matches!(result, Err(crate::error::AppError::Validation(_))));
    }

    #[test]
    fn test_sessions_expire_and_are_deleted() {
        let (db, security) = setup();
        let user = db.create_user("alice", "password123", &security).unwrap();

        db.create_session("digest-1", user.id, 2_000, 1_000).unwrap();

        assert!(db.get_session_user("digest-1", 1_500).unwrap().is_some());
        assert!(db.get_session_user("digest-1", 2_000).unwrap().is_none());
        assert!(db.get_session_user("unknown", 1_500).unwrap().is_none());

        assert_eq!(db.delete_user_sessions(user.id).unwrap(), 1);
        assert!(db.get_session_user("digest-1", 1_500).unwrap().is_none());
    }

    #[test]
    fn test_institution_upsert_overwrites_attributes() {
        let (db, _) = setup();

        let first = InstitutionRecord::from_api(&json!({
            "id": "inst-1", "name": "erebor_mx_retail", "display_name": "Erebor",
            "form_fields": [{"name": "username", "type": "text"}]
        }))
        .unwrap();
        db.upsert_institutions(&[first]).unwrap();

        let second = InstitutionRecord::from_api(&json!({
            "id": "inst-1", "name": "erebor_mx_retail", "display_name": "Erebor Bank",
            "resources": ["ACCOUNTS"]
        }))
        .unwrap();
        db.upsert_institutions(&[second.clone()]).unwrap();

        let stored = db.get_institution_by_name("erebor_mx_retail").unwrap().unwrap();
        assert_eq!(stored, second);
        assert!(db.get_institution_by_name("missing").unwrap().is_none());
    }

    #[test]
    fn test_link_upsert_updates_current_row() {
        let (db, security) = setup();

        db.upsert_link(&link("link-1", "invalid"), None, &security).unwrap();
        assert_eq!(db.count_links("erebor_mx_retail").unwrap(), 1);

        let mut credentials = Credentials::new();
        credentials.insert("username".into(), "test123".into());
        db.upsert_link(&link("link-2", "valid"), Some(&credentials), &security)
            .unwrap();

        assert_eq!(db.count_links("erebor_mx_retail").unwrap(), 1);
        let current = db.get_current_link("erebor_mx_retail").unwrap().unwrap();
        assert_eq!(current.id, "link-2");
        assert!(current.is_valid());
        assert_eq!(current.fetch_resources, vec!["ACCOUNTS"]);

        let stored = db.get_link_credentials("link-2", &security).unwrap();
        assert_eq!(stored, Some(credentials));
        assert!(db.get_link_credentials("link-1", &security).unwrap().is_none());
    }
}
