//! Remote data source: the back-office HTTP API.

pub mod api_types;
mod client;

use std::future::Future;

use serde_json::Value;

use crate::domain::{Collection, Invoice};
use crate::error::FetchError;

pub use api_types::ApiCurrentUser;
pub use client::HttpRemote;

/// Where fresh collection data comes from.
///
/// Bodies are returned undecoded; turning them into records is the cache
/// layer's job so that decode failures are handled like any other fetch
/// failure.
pub trait RemoteSource: Send + Sync + 'static {
  /// `GET /api/<collection>/`, returning the `{ "<collection>": [...] }` body.
  fn fetch_collection(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<Value, FetchError>> + Send;

  /// `GET /api/dashboard/`
  fn fetch_dashboard(&self) -> impl Future<Output = Result<Value, FetchError>> + Send;

  /// Submit a new invoice. Succeeds only if the server accepted it.
  fn submit_invoice(&self, invoice: &Invoice)
    -> impl Future<Output = Result<(), FetchError>> + Send;

  /// Identity attached to the current session cookie.
  fn fetch_identity(&self) -> impl Future<Output = Result<ApiCurrentUser, FetchError>> + Send;
}

/// Remote that is switched off. Every call fails with
/// [`FetchError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl RemoteSource for NoRemote {
  async fn fetch_collection(&self, _collection: Collection) -> Result<Value, FetchError> {
    Err(FetchError::Disabled)
  }

  async fn fetch_dashboard(&self) -> Result<Value, FetchError> {
    Err(FetchError::Disabled)
  }

  async fn submit_invoice(&self, _invoice: &Invoice) -> Result<(), FetchError> {
    Err(FetchError::Disabled)
  }

  async fn fetch_identity(&self) -> Result<ApiCurrentUser, FetchError> {
    Err(FetchError::Disabled)
  }
}

/// Remote double for tests: serves canned bodies and counts calls.
#[cfg(test)]
pub(crate) mod scripted {
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::sync::Mutex;

  use serde_json::Value;
  use tokio::sync::oneshot;

  use super::{ApiCurrentUser, RemoteSource};
  use crate::domain::{Collection, Invoice};
  use crate::error::FetchError;

  #[derive(Default)]
  pub struct ScriptedRemote {
    bodies: Mutex<HashMap<Collection, Value>>,
    dashboard: Mutex<Option<Value>>,
    identity: Mutex<Option<Value>>,
    held: Mutex<Option<oneshot::Receiver<()>>>,
    failing: AtomicBool,
    accept_invoices: AtomicBool,
    fetches: AtomicUsize,
    submissions: AtomicUsize,
  }

  impl ScriptedRemote {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn serve(self, collection: Collection, body: Value) -> Self {
      self.bodies.lock().unwrap().insert(collection, body);
      self
    }

    pub fn serve_dashboard(self, body: Value) -> Self {
      *self.dashboard.lock().unwrap() = Some(body);
      self
    }

    pub fn serve_identity(self, body: Value) -> Self {
      *self.identity.lock().unwrap() = Some(body);
      self
    }

    pub fn accepting_invoices(self) -> Self {
      self.accept_invoices.store(true, Ordering::SeqCst);
      self
    }

    /// The next collection fetch waits until the returned sender fires.
    pub fn hold_next_fetch(&self) -> oneshot::Sender<()> {
      let (release, held) = oneshot::channel();
      *self.held.lock().unwrap() = Some(held);
      release
    }

    pub fn set_failing(&self, failing: bool) {
      self.failing.store(failing, Ordering::SeqCst);
    }

    /// Collection and dashboard fetches so far
    pub fn fetches(&self) -> usize {
      self.fetches.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
      self.submissions.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), FetchError> {
      if self.failing.load(Ordering::SeqCst) {
        Err(FetchError::Status(503))
      } else {
        Ok(())
      }
    }
  }

  impl RemoteSource for ScriptedRemote {
    async fn fetch_collection(&self, collection: Collection) -> Result<Value, FetchError> {
      self.fetches.fetch_add(1, Ordering::SeqCst);
      let held = self.held.lock().unwrap().take();
      if let Some(held) = held {
        let _ = held.await;
      }
      self.check()?;
      self
        .bodies
        .lock()
        .unwrap()
        .get(&collection)
        .cloned()
        .ok_or(FetchError::Status(404))
    }

    async fn fetch_dashboard(&self) -> Result<Value, FetchError> {
      self.fetches.fetch_add(1, Ordering::SeqCst);
      self.check()?;
      self.dashboard.lock().unwrap().clone().ok_or(FetchError::Status(404))
    }

    async fn submit_invoice(&self, _invoice: &Invoice) -> Result<(), FetchError> {
      self.submissions.fetch_add(1, Ordering::SeqCst);
      self.check()?;
      if self.accept_invoices.load(Ordering::SeqCst) {
        Ok(())
      } else {
        Err(FetchError::Rejected("closed".to_string()))
      }
    }

    async fn fetch_identity(&self) -> Result<ApiCurrentUser, FetchError> {
      self.check()?;
      let body = self.identity.lock().unwrap().clone().ok_or(FetchError::Status(401))?;
      Ok(serde_json::from_value(body)?)
    }
  }
}
