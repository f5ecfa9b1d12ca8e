//! Key/value record store backed by the `records` table

use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Database;
use crate::error::Result;
use crate::util::unix_millis_now;

/// Keys persisted in the local record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Community collection mirrored from the cloud endpoint
    CommunityQuizzes,
    /// Quizzes saved on this device (offline shares and cached copies)
    OfflineSharedQuizzes,
    UserName,
    ServerUrl,
    /// Set once the user has gone through server setup
    HasConfiguredServer,
    CachedIpInfo,
}

impl RecordKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CommunityQuizzes => "community_quizzes_global",
            Self::OfflineSharedQuizzes => "offlineSharedQuizzes",
            Self::UserName => "userName",
            Self::ServerUrl => "serverURL",
            Self::HasConfiguredServer => "hasConfiguredServer",
            Self::CachedIpInfo => "cached_ip_info",
        }
    }
}

/// Trait for durable key/value storage of whole JSON documents
pub trait RecordStore {
    /// Read the raw document stored under `key`
    fn get_raw(&self, key: RecordKey) -> Result<Option<String>>;

    /// Replace the document stored under `key`
    fn put_raw(&self, key: RecordKey, value: &str) -> Result<()>;

    /// Delete the document stored under `key`
    fn remove(&self, key: RecordKey) -> Result<()>;

    /// Read and decode a JSON document
    fn load_json<T: DeserializeOwned>(&self, key: RecordKey) -> Result<Option<T>>
    where
        Self: Sized,
    {
        self.get_raw(key)?
            .map(|raw| serde_json::from_str(&raw).map_err(Into::into))
            .transpose()
    }

    /// Encode and store a JSON document
    fn save_json<T: Serialize + ?Sized>(&self, key: RecordKey, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, &raw)
    }
}

/// `SQLite` implementation of `RecordStore`
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    /// Create a store over the given database
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store over a fresh in-memory database (tests, throwaway sessions)
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Read a plain string value (user name, server URL)
    pub fn get_text(&self, key: RecordKey) -> Result<Option<String>> {
        Ok(crate::util::normalize_text_option(self.get_raw(key)?))
    }

    /// Store a boolean flag as `"true"`
    pub fn set_flag(&self, key: RecordKey) -> Result<()> {
        self.put_raw(key, "true")
    }

    pub fn has_flag(&self, key: RecordKey) -> Result<bool> {
        Ok(self
            .get_raw(key)?
            .is_some_and(|value| matches!(value.trim(), "true" | "1")))
    }
}

impl RecordStore for SqliteRecordStore {
    fn get_raw(&self, key: RecordKey) -> Result<Option<String>> {
        let conn = self.db.connection()?;
        let value = conn
            .query_row(
                "SELECT value FROM records WHERE key = ?",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_raw(&self, key: RecordKey, value: &str) -> Result<()> {
        let conn = self.db.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO records (key, value, updated_at) VALUES (?, ?, ?)",
            params![key.as_str(), value, unix_millis_now()],
        )?;
        Ok(())
    }

    fn remove(&self, key: RecordKey) -> Result<()> {
        let conn = self.db.connection()?;
        conn.execute("DELETE FROM records WHERE key = ?", params![key.as_str()])?;
        Ok(())
    }
}
