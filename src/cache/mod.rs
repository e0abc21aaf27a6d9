//! Per-collection caching in front of the remote API.
//!
//! Every read goes through [`CacheLayer`]:
//! - a valid entry (younger than the freshness window) is served without
//!   touching the network
//! - otherwise the remote is asked and the entry replaced
//! - when the remote fails, the answer comes from the fallback chosen by
//!   [`DataSource`] and is marked stale
//!
//! With a remote source, records added or removed locally are kept under
//! their own store key and laid over whatever the remote returns.

mod edits;
mod layer;
mod outcome;

use serde::Deserialize;

pub use layer::{CacheLayer, InvoiceReceipt};
pub use outcome::CacheOutcome;

/// Where collection data comes from and what backs it up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
  /// Remote API, built-in sample data when it fails
  #[default]
  Remote,
  /// Remote API, local store snapshot when it fails
  RemoteWithLocal,
  /// Local store only; the remote is never called
  Offline,
}
