//! Cache layer that orchestrates entry freshness, remote fetching and
//! fallbacks.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use validator::Validate;

use super::edits::{edits_key, LocalEdits};
use super::{CacheOutcome, DataSource};
use crate::domain::{
  assign_id, Collection, DashboardStats, Employee, Insertion, Invoice, Material, Record, Worksite,
  WorksiteStatus,
};
use crate::error::{DataError, FetchError, StoreError, ValidationError};
use crate::remote::api_types::{decode_envelope, ApiDashboard};
use crate::remote::RemoteSource;
use crate::store::{load_json, save_json, LocalStore};

const DEFAULT_FRESHNESS: Duration = Duration::from_secs(5 * 60);

/// Immutable snapshot of one collection. The concrete type behind
/// `records` is always `Vec<T>` for the collection's record type.
struct Entry {
  records: Arc<dyn Any + Send + Sync>,
  /// `None` when built on fallback data; such an entry is never valid
  fetched_at: Option<Instant>,
}

struct Shared<R, S> {
  remote: R,
  store: S,
  source: DataSource,
  /// Never held across an await
  entries: RwLock<HashMap<Collection, Entry>>,
  /// Serializes read-modify-persist sequences and entry replacement, one
  /// per collection
  write_locks: [Mutex<()>; Collection::ALL.len()],
  /// Bumped on every entry replacement, only while the write lock is held
  generations: [AtomicU64; Collection::ALL.len()],
}

/// What happened to a newly created invoice.
#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceReceipt {
  /// Accepted by the remote API
  Submitted(Invoice),
  /// The remote was unavailable; kept in the local store instead
  StoredLocally(Invoice),
}

/// Cache layer that manages entry freshness, network fetching and the
/// local fallback store.
///
/// Cloning is cheap and clones share the same entries.
pub struct CacheLayer<R, S> {
  shared: Arc<Shared<R, S>>,
  /// How long an entry is served without asking the remote
  freshness: Duration,
}

impl<R: RemoteSource, S: LocalStore> CacheLayer<R, S> {
  pub fn new(remote: R, store: S, source: DataSource) -> Self {
    Self {
      shared: Arc::new(Shared {
        remote,
        store,
        source,
        entries: RwLock::new(HashMap::new()),
        write_locks: std::array::from_fn(|_| Mutex::new(())),
        generations: std::array::from_fn(|_| AtomicU64::new(0)),
      }),
      freshness: DEFAULT_FRESHNESS,
    }
  }

  pub fn with_freshness(mut self, freshness: Duration) -> Self {
    self.freshness = freshness;
    self
  }

  pub fn source(&self) -> DataSource {
    self.shared.source
  }

  pub fn remote(&self) -> &R {
    &self.shared.remote
  }

  pub fn store(&self) -> &S {
    &self.shared.store
  }

  /// Current records of `T`'s collection.
  ///
  /// Transport and decode failures never surface here: they are logged and
  /// answered from the fallback. Only local store failures are errors.
  pub async fn get<T: Record>(&self) -> Result<CacheOutcome<Vec<T>>, StoreError> {
    self.read::<T>(None).await
  }

  /// Validate, assign an id, insert and persist a new record.
  pub async fn add<T: Record>(&self, record: T) -> Result<T, DataError> {
    record.validate().map_err(ValidationError::from)?;

    let guard = self.write_lock(T::COLLECTION).lock().await;
    self.insert(record, &guard).await
  }

  /// Remove the record with `id`. Returns false if there was none.
  pub async fn remove<T: Record>(&self, id: &str) -> Result<bool, StoreError> {
    let collection = T::COLLECTION;
    let guard = self.write_lock(collection).lock().await;

    let mut records = self.read::<T>(Some(&guard)).await?.into_records();
    let before = records.len();
    records.retain(|record| record.id() != id);
    if records.len() == before {
      debug!(%collection, id, "nothing to remove");
      return Ok(false);
    }

    self.persist(&records, |edits| edits.record_removed(id))?;
    self.commit(Arc::new(records), self.fetched_at(collection));
    info!(%collection, id, "record removed");

    Ok(true)
  }

  /// Records whose text fields contain `query` (case-insensitive), optionally
  /// restricted to a status.
  pub async fn search<T: Record>(
    &self,
    query: &str,
    status: Option<&str>,
  ) -> Result<Vec<T>, StoreError> {
    Ok(
      self
        .get::<T>()
        .await?
        .into_records()
        .into_iter()
        .filter(|record| record.matches(query, status))
        .collect(),
    )
  }

  pub fn invalidate(&self, collection: Collection) {
    self.entries_mut().remove(&collection);
    debug!(%collection, "entry invalidated");
  }

  /// Drop every entry.
  pub fn clear(&self) {
    self.entries_mut().clear();
    info!("cache cleared");
  }

  /// Headline figures for the dashboard. Falls back to figures computed
  /// from the cached collections when the remote cannot provide them.
  pub async fn dashboard_stats(&self) -> Result<CacheOutcome<DashboardStats>, StoreError> {
    if self.shared.source == DataSource::Offline {
      return Ok(CacheOutcome::Fresh(self.computed_stats().await?));
    }

    match self.fetch_dashboard().await {
      Ok(stats) => Ok(CacheOutcome::Fresh(stats)),
      Err(err) => {
        warn!(error = %err, "dashboard fetch failed, computing locally");
        Ok(CacheOutcome::Stale(self.computed_stats().await?))
      }
    }
  }

  /// Send a new invoice to the remote, keeping it locally if that fails.
  ///
  /// Numbering and submission run under the invoice write lock so that
  /// concurrent creations never share a number.
  pub async fn create_invoice(&self, mut invoice: Invoice) -> Result<InvoiceReceipt, DataError> {
    invoice.validate().map_err(ValidationError::from)?;

    let guard = self.write_lock(Collection::Invoices).lock().await;

    if self.shared.source != DataSource::Offline {
      let current = self.read::<Invoice>(Some(&guard)).await?.into_records();
      let (_, sequence) = assign_id(&current);
      invoice.on_insert(sequence);

      match self.shared.remote.submit_invoice(&invoice).await {
        Ok(()) => {
          info!(number = %invoice.number, "invoice submitted");
          self.invalidate(Collection::Invoices);
          return Ok(InvoiceReceipt::Submitted(invoice));
        }
        Err(err) => warn!(error = %err, "invoice submission failed, storing locally"),
      }
    }

    self.insert(invoice, &guard).await.map(InvoiceReceipt::StoredLocally)
  }

  // --------------------------------------------------------------------------

  /// [`CacheLayer::get`], for callers that may already hold `T`'s write lock.
  async fn read<T: Record>(
    &self,
    held: Option<&MutexGuard<'_, ()>>,
  ) -> Result<CacheOutcome<Vec<T>>, StoreError> {
    let collection = T::COLLECTION;
    let cached = self.entry::<T>();

    if let Some((records, true)) = &cached {
      debug!(%collection, "cache hit");
      return Ok(CacheOutcome::Fresh(records.as_ref().clone()));
    }

    if self.shared.source == DataSource::Offline {
      let _guard = self.lock_unless_held(collection, held).await;
      let records = self.load_local::<T>()?;
      self.commit(Arc::new(records.clone()), Some(Instant::now()));
      return Ok(CacheOutcome::Fresh(records));
    }

    let generation = self.generation(collection);
    match self.fetch_remote::<T>().await {
      Ok(fetched) => {
        let _guard = self.lock_unless_held(collection, held).await;

        // Someone replaced the entry while we were waiting on the network;
        // theirs is at least as recent.
        if self.generation(collection) != generation {
          if let Some((records, true)) = self.entry::<T>() {
            debug!(%collection, "newer entry landed during fetch");
            return Ok(CacheOutcome::Fresh(records.as_ref().clone()));
          }
        }

        debug!(%collection, count = fetched.len(), "fetched from remote");
        if self.shared.source == DataSource::RemoteWithLocal {
          if let Err(err) = save_json(&self.shared.store, collection.key(), &fetched) {
            warn!(%collection, error = %err, "could not snapshot collection locally");
          }
        }

        let records = self.local_edits::<T>()?.apply(fetched);
        self.commit(Arc::new(records.clone()), Some(Instant::now()));
        Ok(CacheOutcome::Fresh(records))
      }
      Err(err) => {
        warn!(%collection, error = %err, "remote fetch failed, serving fallback");

        // An expired entry is still the best thing we have. Local edits are
        // already part of it.
        if let Some((records, _)) = cached {
          return Ok(CacheOutcome::stale_or_unavailable(records.as_ref().clone()));
        }

        let base = match self.shared.source {
          DataSource::RemoteWithLocal => {
            load_json::<Vec<T>, _>(&self.shared.store, collection.key())?.unwrap_or_else(T::sample)
          }
          _ => T::sample(),
        };
        let records = self.local_edits::<T>()?.apply(base);
        Ok(CacheOutcome::stale_or_unavailable(records))
      }
    }
  }

  /// Assign an id, insert and persist `record`. The caller holds `T`'s
  /// write lock and has validated the record.
  async fn insert<T: Record>(
    &self,
    mut record: T,
    guard: &MutexGuard<'_, ()>,
  ) -> Result<T, DataError> {
    let collection = T::COLLECTION;

    let mut records = self.read::<T>(Some(guard)).await?.into_records();
    let (id, sequence) = assign_id(&records);
    record.set_id(id);
    record.on_insert(sequence);

    match collection.insertion() {
      Insertion::Append => records.push(record.clone()),
      Insertion::Prepend => records.insert(0, record.clone()),
    }

    self.persist(&records, |edits| edits.record_added(record.clone()))?;
    self.commit(Arc::new(records), self.fetched_at(collection));
    info!(%collection, id = record.id(), "record added");

    Ok(record)
  }

  /// Write a mutation to the local store. Offline, the store holds the
  /// whole collection; otherwise only the local edits are kept there.
  fn persist<T: Record>(
    &self,
    records: &[T],
    edit: impl FnOnce(&mut LocalEdits<T>),
  ) -> Result<(), StoreError> {
    let collection = T::COLLECTION;
    match self.shared.source {
      DataSource::Offline => save_json(&self.shared.store, collection.key(), records),
      DataSource::Remote | DataSource::RemoteWithLocal => {
        let mut edits = self.local_edits::<T>()?;
        edit(&mut edits);
        save_json(&self.shared.store, &edits_key(collection), &edits)
      }
    }
  }

  fn local_edits<T: Record>(&self) -> Result<LocalEdits<T>, StoreError> {
    Ok(load_json(&self.shared.store, &edits_key(T::COLLECTION))?.unwrap_or_default())
  }

  /// The entry for `T`, with whether it is still inside the window.
  fn entry<T: Record>(&self) -> Option<(Arc<Vec<T>>, bool)> {
    let entries = self
      .shared
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner);
    let entry = entries.get(&T::COLLECTION)?;
    let valid = entry
      .fetched_at
      .is_some_and(|at| at.elapsed() < self.freshness);
    let records = Arc::clone(&entry.records).downcast::<Vec<T>>().ok()?;
    Some((records, valid))
  }

  fn fetched_at(&self, collection: Collection) -> Option<Instant> {
    self
      .shared
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&collection)
      .and_then(|entry| entry.fetched_at)
  }

  /// Replace `T`'s entry. Only called with `T`'s write lock held.
  fn commit<T: Record>(&self, records: Arc<Vec<T>>, fetched_at: Option<Instant>) {
    let collection = T::COLLECTION;
    self
      .entries_mut()
      .insert(collection, Entry { records, fetched_at });
    self.shared.generations[collection as usize].fetch_add(1, Ordering::SeqCst);
  }

  fn generation(&self, collection: Collection) -> u64 {
    self.shared.generations[collection as usize].load(Ordering::SeqCst)
  }

  fn entries_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Collection, Entry>> {
    self
      .shared
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn write_lock(&self, collection: Collection) -> &Mutex<()> {
    &self.shared.write_locks[collection as usize]
  }

  async fn lock_unless_held(
    &self,
    collection: Collection,
    held: Option<&MutexGuard<'_, ()>>,
  ) -> Option<MutexGuard<'_, ()>> {
    match held {
      Some(_) => None,
      None => Some(self.write_lock(collection).lock().await),
    }
  }

  async fn fetch_remote<T: Record>(&self) -> Result<Vec<T>, FetchError> {
    let collection = T::COLLECTION;
    let body = self.shared.remote.fetch_collection(collection).await?;
    decode_envelope::<T::Wire, T>(collection.key(), body)
  }

  async fn fetch_dashboard(&self) -> Result<DashboardStats, FetchError> {
    let body = self.shared.remote.fetch_dashboard().await?;
    let wire: ApiDashboard = serde_json::from_value(body)?;
    Ok(wire.into())
  }

  /// Stored snapshot of `T`, seeded with the built-in sample on first use.
  fn load_local<T: Record>(&self) -> Result<Vec<T>, StoreError> {
    let key = T::COLLECTION.key();
    if let Some(records) = load_json(&self.shared.store, key)? {
      return Ok(records);
    }

    let sample = T::sample();
    save_json(&self.shared.store, key, &sample)?;
    info!(collection = key, "seeded local store with sample data");
    Ok(sample)
  }

  async fn computed_stats(&self) -> Result<DashboardStats, StoreError> {
    let sites = self.get::<Worksite>().await?.into_records();
    let staff = self.get::<Employee>().await?.into_records();
    let materials = self.get::<Material>().await?.into_records();

    Ok(DashboardStats {
      active_worksites: sites
        .iter()
        .filter(|site| site.status == WorksiteStatus::Active)
        .count() as u64,
      personnel: staff.iter().filter(|employee| employee.active).count() as u64,
      materials: materials.iter().map(|m| m.stock.max(0) as u64).sum(),
      monthly_revenue: Some(sites.iter().filter_map(|site| site.budget).sum()),
    })
  }
}

impl<R, S> Clone for CacheLayer<R, S> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
      freshness: self.freshness,
    }
  }
}
