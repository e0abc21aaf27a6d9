//! Records added or removed locally while a remote is the source of truth.
//!
//! They are stored apart from fetched data and laid over every remote
//! result, so a refetch cannot drop them.

use serde::{Deserialize, Serialize};

use crate::domain::{Collection, Insertion, Record};

/// Store key holding the local edits of `collection`.
pub(crate) fn edits_key(collection: Collection) -> String {
  format!("{}.local", collection.key())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LocalEdits<T> {
  /// In display order
  #[serde(default = "Vec::new")]
  pub added: Vec<T>,
  #[serde(default)]
  pub removed: Vec<String>,
}

impl<T> Default for LocalEdits<T> {
  fn default() -> Self {
    Self {
      added: Vec::new(),
      removed: Vec::new(),
    }
  }
}

impl<T: Record> LocalEdits<T> {
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty()
  }

  pub fn record_added(&mut self, record: T) {
    match T::COLLECTION.insertion() {
      Insertion::Append => self.added.push(record),
      Insertion::Prepend => self.added.insert(0, record),
    }
  }

  pub fn record_removed(&mut self, id: &str) {
    let before = self.added.len();
    self.added.retain(|record| record.id() != id);
    if self.added.len() == before && !self.removed.iter().any(|removed| removed == id) {
      self.removed.push(id.to_string());
    }
  }

  /// `base` with removed ids dropped and local additions in place. A local
  /// addition replaces a base record with the same id. Applying twice gives
  /// the same list.
  pub fn apply(&self, base: Vec<T>) -> Vec<T> {
    if self.is_empty() {
      return base;
    }

    let kept = base.into_iter().filter(|record| {
      let id = record.id();
      !self.removed.iter().any(|removed| removed == id)
        && !self.added.iter().any(|added| added.id() == id)
    });

    match T::COLLECTION.insertion() {
      Insertion::Append => kept.chain(self.added.iter().cloned()).collect(),
      Insertion::Prepend => self.added.iter().cloned().chain(kept).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Client, Report};

  fn client(id: &str, name: &str) -> Client {
    Client {
      id: id.to_string(),
      name: name.to_string(),
      email: String::new(),
      phone: String::new(),
      address: String::new(),
    }
  }

  fn ids<T: Record>(records: &[T]) -> Vec<&str> {
    records.iter().map(Record::id).collect()
  }

  #[test]
  fn test_apply_appends_and_drops_removed() {
    let mut edits = LocalEdits::default();
    edits.record_added(client("CL003", "Bâtiments du Sud"));
    edits.record_removed("CL001");

    let base = vec![client("CL001", "Sika CI"), client("CL002", "Kone SARL")];
    let merged = edits.apply(base);
    assert_eq!(ids(&merged), vec!["CL002", "CL003"]);
    assert_eq!(edits.apply(merged.clone()), merged);
  }

  #[test]
  fn test_removing_a_local_addition_forgets_it() {
    let mut edits = LocalEdits::default();
    edits.record_added(client("CL003", "Bâtiments du Sud"));
    edits.record_removed("CL003");

    assert!(edits.is_empty());
  }

  #[test]
  fn test_prepended_collections_keep_newest_first() {
    let mut edits: LocalEdits<Report> = LocalEdits::default();
    let mut first = Report::sample().remove(0);
    first.id = "RPT004".to_string();
    let mut second = first.clone();
    second.id = "RPT005".to_string();
    edits.record_added(first);
    edits.record_added(second);

    let merged = edits.apply(Report::sample());
    assert_eq!(&ids(&merged)[..3], ["RPT005", "RPT004", "RPT001"]);
  }

  #[test]
  fn test_key() {
    assert_eq!(edits_key(Collection::Clients), "clients.local");
  }
}
