//! SQLite-backed local store.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{check_quota, LocalStore};
use crate::error::StoreError;

/// Local store in a single SQLite file.
pub struct SqliteStore {
  conn: Mutex<Connection>,
  quota: Option<usize>,
}

impl SqliteStore {
  /// Open (or create) the store at `path`, creating parent directories.
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    debug!(path = %path.display(), "opening local store");
    Self::from_connection(Connection::open(path)?)
  }

  /// Open the store at the default location in the user data directory.
  pub fn open_default() -> Result<Self, StoreError> {
    Self::open(&Self::default_path()?)
  }

  pub fn open_in_memory() -> Result<Self, StoreError> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  /// Reject any single value larger than `limit` bytes.
  pub fn with_quota(mut self, limit: usize) -> Self {
    self.quota = Some(limit);
    self
  }

  pub fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no data directory"))?;

    Ok(data_dir.join("sitedesk").join("store.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(STORE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
      quota: None,
    })
  }
}

impl LocalStore for SqliteStore {
  fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
    let value = conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
    check_quota(key, value, self.quota)?;
    let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
    conn.execute(
      "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
       ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
      params![key, value],
    )?;
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<(), StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
    conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
    Ok(())
  }
}

const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
