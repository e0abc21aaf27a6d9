//! Local fallback store: string-keyed JSON blobs that survive restarts.

mod sqlite;

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

pub use sqlite::SqliteStore;

/// Key holding the signed-in identity.
pub const SESSION_KEY: &str = "currentUser";

/// Persistent key/value storage backing the cache and the session.
pub trait LocalStore: Send + Sync + 'static {
  fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

  fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

  /// Deleting a missing key is not an error.
  fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and decode the JSON value stored under `key`.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
  T: DeserializeOwned,
  S: LocalStore + ?Sized,
{
  match store.read(key)? {
    Some(raw) => serde_json::from_str(&raw)
      .map(Some)
      .map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
      }),
    None => Ok(None),
  }
}

/// Encode `value` as JSON and store it under `key`.
pub fn save_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
  T: Serialize + ?Sized,
  S: LocalStore + ?Sized,
{
  let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
    key: key.to_string(),
    source,
  })?;
  store.write(key, &raw)
}

fn check_quota(key: &str, value: &str, quota: Option<usize>) -> Result<(), StoreError> {
  match quota {
    Some(limit) if value.len() > limit => Err(StoreError::QuotaExceeded {
      key: key.to_string(),
      size: value.len(),
      limit,
    }),
    _ => Ok(()),
  }
}

/// Process-local store. Nothing outlives the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
  quota: Option<usize>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reject any single value larger than `limit` bytes.
  pub fn with_quota(mut self, limit: usize) -> Self {
    self.quota = Some(limit);
    self
  }
}

impl LocalStore for MemoryStore {
  fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
    let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
    Ok(entries.get(key).cloned())
  }

  fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
    check_quota(key, value, self.quota)?;
    let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
    entries.remove(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Client, Collection, Record};

  #[test]
  fn test_json_helpers_round_trip() {
    let store = MemoryStore::new();
    let clients = Client::sample();
    save_json(&store, Collection::Clients.key(), &clients).unwrap();

    let loaded: Option<Vec<Client>> = load_json(&store, "clients").unwrap();
    assert_eq!(loaded, Some(clients));
    assert_eq!(load_json::<Vec<Client>, _>(&store, "rapports").unwrap(), None);
  }

  #[test]
  fn test_corrupt_value_is_a_serialization_error() {
    let store = MemoryStore::new();
    store.write("chantiers", "{not json").unwrap();

    let err = load_json::<Vec<Client>, _>(&store, "chantiers").unwrap_err();
    assert!(matches!(err, StoreError::Serialization { ref key, .. } if key == "chantiers"));
  }

  #[test]
  fn test_quota_rejects_large_values() {
    let store = MemoryStore::new().with_quota(16);
    store.write("small", "[]").unwrap();

    let err = store.write("big", &"x".repeat(17)).unwrap_err();
    assert!(matches!(err, StoreError::QuotaExceeded { size: 17, limit: 16, .. }));
    assert_eq!(store.read("big").unwrap(), None);
  }

  #[test]
  fn test_delete_missing_key() {
    let store = MemoryStore::new();
    store.delete(SESSION_KEY).unwrap();
    store.write(SESSION_KEY, "{}").unwrap();
    store.delete(SESSION_KEY).unwrap();
    assert_eq!(store.read(SESSION_KEY).unwrap(), None);
  }
}
