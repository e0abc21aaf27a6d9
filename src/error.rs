//! Error types crossing the library boundary.
//!
//! Transport failures (`FetchError`) stay inside the cache layer, which
//! answers them with fallback data. Only store and validation failures
//! reach callers, wrapped in [`DataError`].

/// Failure talking to the remote API.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  /// Network or protocol failure reported by the HTTP client.
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The server answered with a non-2xx status.
  #[error("unexpected HTTP status {0}")]
  Status(u16),

  /// The body was not the shape we expect.
  #[error("malformed payload: {0}")]
  Malformed(String),

  /// The server understood the request but refused it.
  #[error("request rejected by server: {0}")]
  Rejected(String),

  #[error("invalid API URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  /// No remote is configured (offline mode).
  #[error("remote data source disabled")]
  Disabled,
}

impl From<serde_json::Error> for FetchError {
  fn from(err: serde_json::Error) -> Self {
    FetchError::Malformed(err.to_string())
  }
}

/// Failure of the local fallback store. There is nothing behind the store,
/// so these are terminal for the operation that hit them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("store backend error: {0}")]
  Backend(#[from] rusqlite::Error),

  #[error("failed to (de)serialize '{key}': {source}")]
  Serialization {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("quota exceeded writing '{key}': {size} bytes over a {limit} byte limit")]
  QuotaExceeded { key: String, size: usize, limit: usize },

  #[error("store lock poisoned")]
  LockPoisoned,

  #[error("could not prepare store location: {0}")]
  Io(#[from] std::io::Error),
}

/// A create request missing something it needs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
  pub field: String,
  pub message: String,
}

impl ValidationError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      message: message.into(),
    }
  }
}

impl From<validator::ValidationErrors> for ValidationError {
  fn from(errors: validator::ValidationErrors) -> Self {
    // Pick the alphabetically first failing field so the message is stable.
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    match fields.first() {
      Some((field, errs)) => {
        let message = errs
          .first()
          .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
          .unwrap_or_else(|| "invalid value".to_string());
        ValidationError::new(field.to_string(), message)
      }
      None => ValidationError::new("record", "invalid record"),
    }
  }
}

/// Errors surfaced by data operations.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),
}

/// Failure starting a session for the user the remote says we are.
#[derive(Debug, thiserror::Error)]
pub enum SignInError {
  #[error("could not fetch the signed-in user: {0}")]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Store(#[from] StoreError),
}
