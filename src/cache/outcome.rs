/// Result of a cache read, tagged with how trustworthy the data is.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOutcome<T> {
  /// Served from a valid entry or just fetched from the source of truth
  Fresh(T),
  /// The remote could not be reached; data came from a fallback
  Stale(T),
  /// Nothing could be produced at all
  Unavailable,
}

impl<T> CacheOutcome<T> {
  pub fn is_fresh(&self) -> bool {
    matches!(self, CacheOutcome::Fresh(_))
  }

  pub fn is_stale(&self) -> bool {
    matches!(self, CacheOutcome::Stale(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      CacheOutcome::Fresh(data) | CacheOutcome::Stale(data) => Some(data),
      CacheOutcome::Unavailable => None,
    }
  }

  pub fn into_data(self) -> Option<T> {
    match self {
      CacheOutcome::Fresh(data) | CacheOutcome::Stale(data) => Some(data),
      CacheOutcome::Unavailable => None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheOutcome<U> {
    match self {
      CacheOutcome::Fresh(data) => CacheOutcome::Fresh(f(data)),
      CacheOutcome::Stale(data) => CacheOutcome::Stale(f(data)),
      CacheOutcome::Unavailable => CacheOutcome::Unavailable,
    }
  }
}

impl<T> CacheOutcome<Vec<T>> {
  /// Records carried by the outcome, empty when unavailable.
  pub fn into_records(self) -> Vec<T> {
    self.into_data().unwrap_or_default()
  }

  /// An empty fallback counts as nothing at all.
  pub(crate) fn stale_or_unavailable(records: Vec<T>) -> Self {
    if records.is_empty() {
      CacheOutcome::Unavailable
    } else {
      CacheOutcome::Stale(records)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_accessors() {
    let fresh = CacheOutcome::Fresh(vec![1, 2]);
    assert!(fresh.is_fresh());
    assert_eq!(fresh.data(), Some(&vec![1, 2]));

    let stale = CacheOutcome::stale_or_unavailable(vec![3]);
    assert!(stale.is_stale());
    assert_eq!(stale.map(|v| v.len()), CacheOutcome::Stale(1));

    let none = CacheOutcome::<Vec<u8>>::stale_or_unavailable(Vec::new());
    assert_eq!(none, CacheOutcome::Unavailable);
    assert!(none.into_records().is_empty());
  }
}
