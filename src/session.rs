//! The signed-in session: identity, its access gate and the data cache.
//!
//! Every data operation available to a front end goes through [`Session`],
//! so the gate is always consulted before the cache.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::{AccessGate, Action, Field, Gated, Page, Role};
use crate::cache::{CacheLayer, CacheOutcome, InvoiceReceipt};
use crate::domain::{
  Client, Collection, DashboardStats, Employee, Invoice, Material, Record, Report, Supplier,
  Worksite,
};
use crate::error::{DataError, SignInError, StoreError};
use crate::remote::{ApiCurrentUser, RemoteSource};
use crate::store::{load_json, save_json, LocalStore, SESSION_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub username: String,
  pub display_name: String,
  pub role: Role,
}

impl Identity {
  pub fn new(username: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
    Self {
      username: username.into(),
      display_name: display_name.into(),
      role,
    }
  }
}

impl From<ApiCurrentUser> for Identity {
  fn from(user: ApiCurrentUser) -> Self {
    let display_name = if user.full_name.trim().is_empty() {
      user.username.clone()
    } else {
      user.full_name
    };
    Identity {
      username: user.username,
      display_name,
      role: Role::parse(&user.role),
    }
  }
}

/// What a page shows once loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
  Dashboard(DashboardStats),
  Worksites(Vec<Worksite>),
  Personnel(Vec<Employee>),
  Materials(Vec<Material>),
  Invoices(Vec<Invoice>),
  Reports(Vec<Report>),
  Suppliers(Vec<Supplier>),
  Clients(Vec<Client>),
}

impl PageContent {
  /// Number of listed records; the dashboard counts as one.
  pub fn len(&self) -> usize {
    match self {
      PageContent::Dashboard(_) => 1,
      PageContent::Worksites(r) => r.len(),
      PageContent::Personnel(r) => r.len(),
      PageContent::Materials(r) => r.len(),
      PageContent::Invoices(r) => r.len(),
      PageContent::Reports(r) => r.len(),
      PageContent::Suppliers(r) => r.len(),
      PageContent::Clients(r) => r.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// A loaded page together with what the role may see and do on it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
  pub page: Page,
  pub content: CacheOutcome<PageContent>,
  pub hidden: Vec<Field>,
  pub actions: Vec<Action>,
}

/// Text filter applied to a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
  pub query: String,
  pub status: Option<String>,
}

impl Filter {
  pub fn new(query: impl Into<String>, status: Option<String>) -> Self {
    Self {
      query: query.into(),
      status,
    }
  }
}

pub struct Session<R, S> {
  identity: Identity,
  gate: AccessGate,
  cache: CacheLayer<R, S>,
}

impl<R: RemoteSource, S: LocalStore> Session<R, S> {
  /// Start a new session for `identity`, remembering it in the local store.
  /// Entries left by a previous identity are dropped.
  pub fn start(cache: CacheLayer<R, S>, identity: Identity) -> Result<Self, StoreError> {
    save_json(cache.store(), SESSION_KEY, &identity)?;
    cache.clear();
    info!(user = %identity.username, role = %identity.role, "session started");

    Ok(Self {
      gate: AccessGate::new(identity.role),
      identity,
      cache,
    })
  }

  /// Start a session for the identity attached to the remote's session
  /// cookie.
  pub async fn start_remote(cache: CacheLayer<R, S>) -> Result<Self, SignInError> {
    let user = cache.remote().fetch_identity().await?;
    Ok(Self::start(cache, user.into())?)
  }

  /// Resume the session remembered in the local store, if any.
  pub fn restore(cache: CacheLayer<R, S>) -> Result<Option<Self>, StoreError> {
    let identity: Option<Identity> = load_json(cache.store(), SESSION_KEY)?;
    Ok(identity.map(|identity| Self {
      gate: AccessGate::new(identity.role),
      identity,
      cache,
    }))
  }

  /// Switch to another identity. The role, and with it the gate, is only
  /// ever re-derived here, and every cached entry is dropped.
  pub fn reauthenticate(&mut self, identity: Identity) -> Result<(), StoreError> {
    save_json(self.cache.store(), SESSION_KEY, &identity)?;
    self.cache.clear();
    self.gate = AccessGate::new(identity.role);
    info!(user = %identity.username, role = %identity.role, "re-authenticated");
    self.identity = identity;
    Ok(())
  }

  pub fn logout(self) -> Result<(), StoreError> {
    self.cache.store().delete(SESSION_KEY)?;
    self.cache.clear();
    info!(user = %self.identity.username, "logged out");
    Ok(())
  }

  pub fn identity(&self) -> &Identity {
    &self.identity
  }

  pub fn gate(&self) -> &AccessGate {
    &self.gate
  }

  pub fn cache(&self) -> &CacheLayer<R, S> {
    &self.cache
  }

  pub fn landing_page(&self) -> Page {
    self.gate.landing_page()
  }

  /// Load `page` if the role may see it.
  pub async fn open(&self, page: Page) -> Result<Gated<PageView>, StoreError> {
    self.open_filtered(page, None).await
  }

  /// Load `page` keeping only records matching `filter`. The dashboard
  /// ignores the filter.
  pub async fn open_filtered(
    &self,
    page: Page,
    filter: Option<&Filter>,
  ) -> Result<Gated<PageView>, StoreError> {
    self
      .gate
      .enforce(page, || async move {
        let content = self.load(page, filter).await?;
        Ok::<_, StoreError>(PageView {
          page,
          content,
          hidden: self.gate.hidden_fields().to_vec(),
          actions: self.gate.allowed_actions(page),
        })
      })
      .await
      .transpose()
  }

  /// Dashboard figures with revenue withheld from roles that may not see it.
  pub async fn dashboard(&self) -> Result<Gated<CacheOutcome<DashboardStats>>, StoreError> {
    self
      .gate
      .enforce(Page::Dashboard, || self.load_dashboard())
      .await
      .transpose()
  }

  pub async fn search<T: Record>(
    &self,
    query: &str,
    status: Option<&str>,
  ) -> Result<Gated<Vec<T>>, StoreError> {
    self
      .gate
      .enforce(Page::for_collection(T::COLLECTION), || async move {
        let found = self.cache.search::<T>(query, status).await?;
        Ok::<_, StoreError>(self.gate.redact(found))
      })
      .await
      .transpose()
  }

  pub async fn add<T: Record>(&self, record: T) -> Result<Gated<T>, DataError> {
    if let Err(denied) = self.gate.check_action(Action::Create(T::COLLECTION)) {
      return Ok(Gated::Denied(denied));
    }
    self.cache.add(record).await.map(Gated::Granted)
  }

  pub async fn remove<T: Record>(&self, id: &str) -> Result<Gated<bool>, StoreError> {
    if let Err(denied) = self.gate.check_action(Action::Delete(T::COLLECTION)) {
      return Ok(Gated::Denied(denied));
    }
    self.cache.remove::<T>(id).await.map(Gated::Granted)
  }

  /// [`Session::remove`] for a collection only known at runtime.
  pub async fn remove_from(
    &self,
    collection: Collection,
    id: &str,
  ) -> Result<Gated<bool>, StoreError> {
    match collection {
      Collection::Worksites => self.remove::<Worksite>(id).await,
      Collection::Personnel => self.remove::<Employee>(id).await,
      Collection::Materials => self.remove::<Material>(id).await,
      Collection::Clients => self.remove::<Client>(id).await,
      Collection::Suppliers => self.remove::<Supplier>(id).await,
      Collection::Invoices => self.remove::<Invoice>(id).await,
      Collection::Reports => self.remove::<Report>(id).await,
    }
  }

  pub async fn create_invoice(&self, invoice: Invoice) -> Result<Gated<InvoiceReceipt>, DataError> {
    if let Err(denied) = self.gate.check_action(Action::Create(Collection::Invoices)) {
      return Ok(Gated::Denied(denied));
    }
    self.cache.create_invoice(invoice).await.map(Gated::Granted)
  }

  async fn load_dashboard(&self) -> Result<CacheOutcome<DashboardStats>, StoreError> {
    let outcome = self.cache.dashboard_stats().await?;
    Ok(outcome.map(|mut stats| {
      if !self.gate.can_see(Field::Revenue) {
        stats.monthly_revenue = None;
      }
      stats
    }))
  }

  async fn load(
    &self,
    page: Page,
    filter: Option<&Filter>,
  ) -> Result<CacheOutcome<PageContent>, StoreError> {
    Ok(match page {
      Page::Dashboard => self.load_dashboard().await?.map(PageContent::Dashboard),
      Page::Worksites => self.listing(filter).await?.map(PageContent::Worksites),
      Page::Personnel => self.listing(filter).await?.map(PageContent::Personnel),
      Page::Materials => self.listing(filter).await?.map(PageContent::Materials),
      Page::Invoices => self.listing(filter).await?.map(PageContent::Invoices),
      Page::Reports => self.listing(filter).await?.map(PageContent::Reports),
      Page::Suppliers => self.listing(filter).await?.map(PageContent::Suppliers),
      Page::Clients => self.listing(filter).await?.map(PageContent::Clients),
    })
  }

  async fn listing<T: Record>(
    &self,
    filter: Option<&Filter>,
  ) -> Result<CacheOutcome<Vec<T>>, StoreError> {
    let outcome = self.cache.get::<T>().await?;
    Ok(outcome.map(|records| {
      let records = match filter {
        Some(filter) => records
          .into_iter()
          .filter(|r| r.matches(&filter.query, filter.status.as_deref()))
          .collect(),
        None => records,
      };
      self.gate.redact(records)
    }))
  }
}
