//! Role-based access control.
//!
//! A role maps to an allow-list of pages; within an allowed page some fields
//! may be hidden and only some actions offered. Checks run before any data
//! is fetched.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Collection, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[serde(alias = "directeur", alias = "admin")]
  Director,
  #[serde(alias = "chef", alias = "chef_chantier")]
  Chief,
  #[serde(alias = "ouvrier")]
  Worker,
  /// Anything we do not recognise; gets the narrowest view
  #[serde(other)]
  Unknown,
}

impl Role {
  /// Lenient parse of role names as the API and users spell them.
  pub fn parse(raw: &str) -> Role {
    match raw.trim().to_lowercase().as_str() {
      "director" | "directeur" | "admin" => Role::Director,
      "chief" | "chef" | "chef_chantier" => Role::Chief,
      "worker" | "ouvrier" => Role::Worker,
      _ => Role::Unknown,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Role::Director => "director",
      Role::Chief => "chief",
      Role::Worker => "worker",
      Role::Unknown => "unknown",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Role::Director => "Directeur",
      Role::Chief => "Chef de chantier",
      Role::Worker => "Ouvrier",
      Role::Unknown => "Inconnu",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Navigable sections of the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
  Dashboard,
  Worksites,
  Personnel,
  Materials,
  Invoices,
  Reports,
  Suppliers,
  Clients,
}

impl Page {
  pub const ALL: [Page; 8] = [
    Page::Dashboard,
    Page::Worksites,
    Page::Personnel,
    Page::Materials,
    Page::Invoices,
    Page::Reports,
    Page::Suppliers,
    Page::Clients,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Page::Dashboard => "dashboard",
      Page::Worksites => "chantiers",
      Page::Personnel => "personnel",
      Page::Materials => "materiaux",
      Page::Invoices => "devis-factures",
      Page::Reports => "rapports",
      Page::Suppliers => "fournisseurs",
      Page::Clients => "clients",
    }
  }

  pub fn from_key(key: &str) -> Option<Page> {
    Page::ALL.into_iter().find(|page| page.key() == key)
  }

  pub fn title(self) -> &'static str {
    match self {
      Page::Dashboard => "Tableau de bord",
      Page::Worksites => "Chantiers",
      Page::Personnel => "Personnel",
      Page::Materials => "Matériaux",
      Page::Invoices => "Devis & Factures",
      Page::Reports => "Rapports",
      Page::Suppliers => "Fournisseurs",
      Page::Clients => "Clients",
    }
  }

  /// Collection listed on this page. The dashboard has none.
  pub fn collection(self) -> Option<Collection> {
    match self {
      Page::Dashboard => None,
      Page::Worksites => Some(Collection::Worksites),
      Page::Personnel => Some(Collection::Personnel),
      Page::Materials => Some(Collection::Materials),
      Page::Invoices => Some(Collection::Invoices),
      Page::Reports => Some(Collection::Reports),
      Page::Suppliers => Some(Collection::Suppliers),
      Page::Clients => Some(Collection::Clients),
    }
  }

  pub fn for_collection(collection: Collection) -> Page {
    match collection {
      Collection::Worksites => Page::Worksites,
      Collection::Personnel => Page::Personnel,
      Collection::Materials => Page::Materials,
      Collection::Clients => Page::Clients,
      Collection::Suppliers => Page::Suppliers,
      Collection::Invoices => Page::Invoices,
      Collection::Reports => Page::Reports,
    }
  }
}

impl fmt::Display for Page {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

/// Sensitive values hidden from some roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
  Revenue,
  WorksiteBudget,
  HourlyRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
  Create(Collection),
  Delete(Collection),
}

impl Action {
  pub fn collection(self) -> Collection {
    match self {
      Action::Create(c) | Action::Delete(c) => c,
    }
  }

  pub fn page(self) -> Page {
    Page::for_collection(self.collection())
  }
}

/// A page or action refused to the current role. Carries the notice shown
/// to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{notice}")]
pub struct AccessDenied {
  pub role: Role,
  pub page: Page,
  pub notice: String,
}

impl AccessDenied {
  fn page(role: Role, page: Page) -> Self {
    Self {
      role,
      page,
      notice: format!(
        "Accès refusé : la page « {} » n'est pas disponible pour le rôle {}.",
        page.title(),
        role.label()
      ),
    }
  }

  fn action(role: Role, action: Action) -> Self {
    let verb = match action {
      Action::Create(_) => "ajouter",
      Action::Delete(_) => "supprimer",
    };
    Self {
      role,
      page: action.page(),
      notice: format!(
        "Action non autorisée : le rôle {} ne peut pas {} dans « {} ».",
        role.label(),
        verb,
        action.page().title()
      ),
    }
  }
}

/// Result of running a loader behind the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum Gated<T> {
  Granted(T),
  Denied(AccessDenied),
}

impl<T> Gated<T> {
  pub fn is_granted(&self) -> bool {
    matches!(self, Gated::Granted(_))
  }

  pub fn into_result(self) -> Result<T, AccessDenied> {
    match self {
      Gated::Granted(value) => Ok(value),
      Gated::Denied(denied) => Err(denied),
    }
  }
}

impl<T, E> Gated<Result<T, E>> {
  /// Lift a loader failure out of a granted result.
  pub fn transpose(self) -> Result<Gated<T>, E> {
    match self {
      Gated::Granted(result) => result.map(Gated::Granted),
      Gated::Denied(denied) => Ok(Gated::Denied(denied)),
    }
  }
}

const DIRECTOR_PAGES: &[Page] = &Page::ALL;
const CHIEF_PAGES: &[Page] = &[
  Page::Dashboard,
  Page::Worksites,
  Page::Materials,
  Page::Reports,
  Page::Clients,
];
const WORKER_PAGES: &[Page] = &[Page::Reports, Page::Worksites];
const UNKNOWN_PAGES: &[Page] = &[Page::Dashboard];

/// Access decisions for one role. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGate {
  role: Role,
}

impl AccessGate {
  pub fn new(role: Role) -> Self {
    Self { role }
  }

  pub fn role(&self) -> Role {
    self.role
  }

  pub fn allowed_pages(&self) -> &'static [Page] {
    match self.role {
      Role::Director => DIRECTOR_PAGES,
      Role::Chief => CHIEF_PAGES,
      Role::Worker => WORKER_PAGES,
      Role::Unknown => UNKNOWN_PAGES,
    }
  }

  pub fn can_access(&self, page: Page) -> bool {
    self.allowed_pages().contains(&page)
  }

  pub fn landing_page(&self) -> Page {
    match self.role {
      Role::Director | Role::Unknown => Page::Dashboard,
      Role::Chief => Page::Worksites,
      Role::Worker => Page::Reports,
    }
  }

  pub fn hidden_fields(&self) -> &'static [Field] {
    match self.role {
      Role::Director => &[],
      Role::Chief => &[Field::Revenue, Field::HourlyRate],
      Role::Worker | Role::Unknown => &[Field::Revenue, Field::WorksiteBudget, Field::HourlyRate],
    }
  }

  pub fn can_see(&self, field: Field) -> bool {
    !self.hidden_fields().contains(&field)
  }

  /// `records` with every field this role may not see cleared.
  pub fn redact<T: Record>(&self, mut records: Vec<T>) -> Vec<T> {
    let hidden = self.hidden_fields();
    if !hidden.is_empty() {
      records.iter_mut().for_each(|record| record.redact(hidden));
    }
    records
  }

  pub fn can(&self, action: Action) -> bool {
    if !self.can_access(action.page()) {
      return false;
    }

    match (self.role, action) {
      (Role::Director, _) => true,
      (
        Role::Chief,
        Action::Create(Collection::Reports | Collection::Clients | Collection::Materials),
      ) => true,
      (Role::Worker, Action::Create(Collection::Reports)) => true,
      _ => false,
    }
  }

  /// Actions offered on `page`, create before delete.
  pub fn allowed_actions(&self, page: Page) -> Vec<Action> {
    let Some(collection) = page.collection() else {
      return Vec::new();
    };

    [Action::Create(collection), Action::Delete(collection)]
      .into_iter()
      .filter(|action| self.can(*action))
      .collect()
  }

  pub fn check(&self, page: Page) -> Result<(), AccessDenied> {
    if self.can_access(page) {
      Ok(())
    } else {
      info!(role = %self.role, %page, "page access denied");
      Err(AccessDenied::page(self.role, page))
    }
  }

  pub fn check_action(&self, action: Action) -> Result<(), AccessDenied> {
    if self.can(action) {
      Ok(())
    } else {
      info!(role = %self.role, ?action, "action denied");
      Err(AccessDenied::action(self.role, action))
    }
  }

  /// Run `loader` only if `page` is allowed. A denied page never triggers
  /// the load.
  pub async fn enforce<T, F, Fut>(&self, page: Page, loader: F) -> Gated<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
  {
    match self.check(page) {
      Ok(()) => Gated::Granted(loader().await),
      Err(denied) => Gated::Denied(denied),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn keys(pages: &[Page]) -> Vec<&'static str> {
    pages.iter().map(|p| p.key()).collect()
  }

  #[test]
  fn test_allowed_pages_per_role() {
    assert_eq!(
      keys(AccessGate::new(Role::Director).allowed_pages()),
      vec![
        "dashboard",
        "chantiers",
        "personnel",
        "materiaux",
        "devis-factures",
        "rapports",
        "fournisseurs",
        "clients"
      ]
    );
    assert_eq!(
      keys(AccessGate::new(Role::Chief).allowed_pages()),
      vec!["dashboard", "chantiers", "materiaux", "rapports", "clients"]
    );
    assert_eq!(
      keys(AccessGate::new(Role::Worker).allowed_pages()),
      vec!["rapports", "chantiers"]
    );
    assert_eq!(keys(AccessGate::new(Role::Unknown).allowed_pages()), vec!["dashboard"]);
  }

  #[tokio::test]
  async fn test_denied_page_never_runs_loader() {
    let gate = AccessGate::new(Role::Worker);
    let calls = AtomicUsize::new(0);

    let gated = gate
      .enforce(Page::Suppliers, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        "suppliers"
      })
      .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let Gated::Denied(denied) = gated else {
      panic!("worker must not reach suppliers");
    };
    assert_eq!(denied.page, Page::Suppliers);
    assert!(denied.notice.contains("Fournisseurs"));
  }

  #[tokio::test]
  async fn test_allowed_page_runs_loader_once() {
    let gate = AccessGate::new(Role::Worker);
    let calls = AtomicUsize::new(0);

    let gated = gate
      .enforce(Page::Reports, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        3
      })
      .await;

    assert_eq!(gated, Gated::Granted(3));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_field_visibility() {
    let director = AccessGate::new(Role::Director);
    assert!(director.can_see(Field::Revenue));
    assert!(director.can_see(Field::HourlyRate));

    let chief = AccessGate::new(Role::Chief);
    assert!(!chief.can_see(Field::Revenue));
    assert!(!chief.can_see(Field::HourlyRate));
    assert!(chief.can_see(Field::WorksiteBudget));

    for role in [Role::Worker, Role::Unknown] {
      let gate = AccessGate::new(role);
      assert!(!gate.can_see(Field::WorksiteBudget));
      assert!(!gate.can_see(Field::Revenue));
    }
  }

  #[test]
  fn test_action_visibility() {
    let director = AccessGate::new(Role::Director);
    assert!(director.can(Action::Delete(Collection::Suppliers)));
    assert_eq!(director.allowed_actions(Page::Dashboard), Vec::new());

    let chief = AccessGate::new(Role::Chief);
    assert_eq!(
      chief.allowed_actions(Page::Reports),
      vec![Action::Create(Collection::Reports)]
    );
    assert!(chief.can(Action::Create(Collection::Materials)));
    assert!(!chief.can(Action::Create(Collection::Worksites)));
    assert!(!chief.can(Action::Delete(Collection::Clients)));
    // Page not allowed, so the action is not either.
    assert!(!chief.can(Action::Create(Collection::Suppliers)));

    let worker = AccessGate::new(Role::Worker);
    assert!(worker.can(Action::Create(Collection::Reports)));
    assert!(worker.allowed_actions(Page::Worksites).is_empty());

    let denied = worker.check_action(Action::Delete(Collection::Reports)).unwrap_err();
    assert_eq!(denied.page, Page::Reports);
  }

  #[test]
  fn test_landing_page_is_always_allowed() {
    for role in [Role::Director, Role::Chief, Role::Worker, Role::Unknown] {
      let gate = AccessGate::new(role);
      assert!(gate.can_access(gate.landing_page()), "{role}");
    }
    assert_eq!(AccessGate::new(Role::Chief).landing_page(), Page::Worksites);
    assert_eq!(AccessGate::new(Role::Worker).landing_page(), Page::Reports);
  }

  #[test]
  fn test_role_parsing() {
    assert_eq!(Role::parse(" Directeur "), Role::Director);
    assert_eq!(Role::parse("chef_chantier"), Role::Chief);
    assert_eq!(Role::parse("OUVRIER"), Role::Worker);
    assert_eq!(Role::parse("comptable"), Role::Unknown);

    let role: Role = serde_json::from_str("\"chef\"").unwrap();
    assert_eq!(role, Role::Chief);
    let role: Role = serde_json::from_str("\"stagiaire\"").unwrap();
    assert_eq!(role, Role::Unknown);
  }

  #[test]
  fn test_pages_and_collections() {
    assert_eq!(Page::from_key("devis-factures"), Some(Page::Invoices));
    assert_eq!(Page::from_key("factures"), None);
    for collection in Collection::ALL {
      assert_eq!(Page::for_collection(collection).collection(), Some(collection));
    }
  }
}
