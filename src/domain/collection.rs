//! Collection identifiers and the record trait binding each one to its type.

use std::collections::HashSet;
use std::fmt;

use chrono::Datelike;
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

use super::samples;
use super::types::{Client, Employee, Invoice, Material, Report, Supplier, Worksite};
use crate::access::Field;
use crate::remote::api_types::{
  ApiClient, ApiEmployee, ApiInvoice, ApiMaterial, ApiReport, ApiSupplier, ApiWorksite,
};

/// The domain collections the back office manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
  Worksites,
  Personnel,
  Materials,
  Clients,
  Suppliers,
  Invoices,
  Reports,
}

/// Where a newly created record goes in its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
  Append,
  /// Newest first
  Prepend,
}

impl Collection {
  pub const ALL: [Collection; 7] = [
    Collection::Worksites,
    Collection::Personnel,
    Collection::Materials,
    Collection::Clients,
    Collection::Suppliers,
    Collection::Invoices,
    Collection::Reports,
  ];

  /// Store key, also the field name wrapping the list in API responses.
  pub fn key(self) -> &'static str {
    match self {
      Self::Worksites => "chantiers",
      Self::Personnel => "personnel",
      Self::Materials => "materiaux",
      Self::Clients => "clients",
      Self::Suppliers => "fournisseurs",
      Self::Invoices => "factures",
      Self::Reports => "rapports",
    }
  }

  pub fn endpoint(self) -> String {
    format!("/api/{}/", self.key())
  }

  pub fn id_prefix(self) -> &'static str {
    match self {
      Self::Worksites => "CH",
      Self::Personnel => "EMP",
      Self::Materials => "MAT",
      Self::Clients => "CL",
      Self::Suppliers => "FOU",
      Self::Invoices => "FAC",
      Self::Reports => "RPT",
    }
  }

  pub fn insertion(self) -> Insertion {
    match self {
      Self::Reports => Insertion::Prepend,
      _ => Insertion::Append,
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

/// A record type stored in exactly one collection.
///
/// Implementors tie together the collection id, the wire shape the API
/// returns for it, and the fields used by text search.
pub trait Record:
  Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + Validate + 'static
{
  const COLLECTION: Collection;

  /// Transfer object decoded from the remote API
  type Wire: DeserializeOwned + Into<Self>;

  fn id(&self) -> &str;

  fn set_id(&mut self, id: String);

  /// Fields matched by free-text search
  fn search_fields(&self) -> Vec<&str>;

  /// Field compared for equality by the search status filter
  fn status_key(&self) -> Option<&str> {
    None
  }

  /// Built-in data served when nothing better is available
  fn sample() -> Vec<Self>;

  /// Called once the record has its id, before it is stored.
  fn on_insert(&mut self, _sequence: usize) {}

  /// Clear the values of `hidden` fields this record carries.
  fn redact(&mut self, _hidden: &[Field]) {}

  /// Case-insensitive substring match plus optional status equality.
  /// An empty query matches everything; a status filter is ignored by
  /// records without a status-like field.
  fn matches(&self, query: &str, status: Option<&str>) -> bool {
    let query = query.trim().to_lowercase();
    let matches_query = query.is_empty()
      || self
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&query));

    let matches_status = match (status, self.status_key()) {
      (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
      _ => true,
    };

    matches_query && matches_status
  }
}

/// Next free id for a collection: `<PREFIX><seq:03>` with `seq` starting at
/// `len + 1` and skipping ids already taken.
pub fn assign_id<T: Record>(records: &[T]) -> (String, usize) {
  let taken: HashSet<&str> = records.iter().map(Record::id).collect();
  let prefix = T::COLLECTION.id_prefix();
  let mut sequence = records.len() + 1;
  loop {
    let id = format!("{}{:03}", prefix, sequence);
    if !taken.contains(id.as_str()) {
      return (id, sequence);
    }
    sequence += 1;
  }
}

// ============================================================================
// Record implementations
// ============================================================================

impl Record for Worksite {
  const COLLECTION: Collection = Collection::Worksites;
  type Wire = ApiWorksite;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![self.name.as_str(), self.client.as_str()]
  }

  fn status_key(&self) -> Option<&str> {
    Some(self.status.as_str())
  }

  fn sample() -> Vec<Self> {
    samples::worksites()
  }

  fn redact(&mut self, hidden: &[Field]) {
    if hidden.contains(&Field::WorksiteBudget) {
      self.budget = None;
    }
  }
}

impl Record for Employee {
  const COLLECTION: Collection = Collection::Personnel;
  type Wire = ApiEmployee;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![self.name.as_str(), self.role.as_str()]
  }

  fn status_key(&self) -> Option<&str> {
    Some(&self.role)
  }

  fn sample() -> Vec<Self> {
    samples::personnel()
  }

  fn redact(&mut self, hidden: &[Field]) {
    if hidden.contains(&Field::HourlyRate) {
      self.hourly_rate = None;
    }
  }
}

impl Record for Material {
  const COLLECTION: Collection = Collection::Materials;
  type Wire = ApiMaterial;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![self.name.as_str(), self.category.as_str()]
  }

  fn status_key(&self) -> Option<&str> {
    Some(&self.category)
  }

  fn sample() -> Vec<Self> {
    samples::materials()
  }
}

impl Record for Client {
  const COLLECTION: Collection = Collection::Clients;
  type Wire = ApiClient;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![self.name.as_str(), self.email.as_str()]
  }

  fn sample() -> Vec<Self> {
    samples::clients()
  }
}

impl Record for Supplier {
  const COLLECTION: Collection = Collection::Suppliers;
  type Wire = ApiSupplier;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![self.name.as_str(), self.specialty.as_str(), self.contact.as_str()]
  }

  fn sample() -> Vec<Self> {
    samples::suppliers()
  }
}

impl Record for Invoice {
  const COLLECTION: Collection = Collection::Invoices;
  type Wire = ApiInvoice;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }

  fn search_fields(&self) -> Vec<&str> {
    let mut fields = vec![self.number.as_str()];
    if let Some(name) = &self.client_name {
      fields.push(name);
    }
    fields
  }

  fn status_key(&self) -> Option<&str> {
    Some(self.status.as_str())
  }

  fn sample() -> Vec<Self> {
    samples::invoices()
  }

  fn on_insert(&mut self, sequence: usize) {
    if self.number.trim().is_empty() {
      self.number = format!("{}-FAC-{:03}", self.date.year(), sequence);
    }
  }
}

impl Record for Report {
  const COLLECTION: Collection = Collection::Reports;
  type Wire = ApiReport;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![self.title.as_str(), self.author.as_str(), self.summary.as_str()]
  }

  fn sample() -> Vec<Self> {
    samples::reports()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_assign_id_uses_length_plus_one() {
    let sites = samples::worksites();
    assert_eq!(sites.len(), 3);
    let (id, seq) = assign_id(&sites);
    assert_eq!(id, "CH004");
    assert_eq!(seq, 4);
  }

  #[test]
  fn test_assign_id_skips_taken_ids() {
    // CH001 removed: length is 2 but CH003 is still in use.
    let sites: Vec<Worksite> = samples::worksites().into_iter().skip(1).collect();
    let (id, _) = assign_id(&sites);
    assert_eq!(id, "CH004");
  }

  #[test]
  fn test_assign_id_on_empty_collection() {
    let (id, seq) = assign_id::<Report>(&[]);
    assert_eq!(id, "RPT001");
    assert_eq!(seq, 1);
  }

  #[test]
  fn test_matches_is_case_insensitive() {
    let site = &samples::worksites()[0];
    assert!(site.matches("cocody", None));
    assert!(site.matches("KOUASSI", None));
    assert!(!site.matches("marcory", None));
  }

  #[test]
  fn test_empty_query_matches_all() {
    assert!(samples::clients().iter().all(|c| c.matches("", None)));
    assert!(samples::clients().iter().all(|c| c.matches("   ", None)));
  }

  #[test]
  fn test_status_filter() {
    let sites = samples::worksites();
    let active: Vec<_> = sites.iter().filter(|s| s.matches("", Some("active"))).collect();
    assert_eq!(active.len(), 2);

    // Clients have no status field, so the filter does not apply.
    assert!(samples::clients()[0].matches("", Some("active")));
  }

  #[test]
  fn test_invoice_number_generated_on_insert() {
    let mut inv = samples::invoices().remove(0);
    inv.number.clear();
    inv.on_insert(4);
    assert_eq!(inv.number, "2024-FAC-004");

    let mut numbered = samples::invoices().remove(1);
    numbered.on_insert(9);
    assert_eq!(numbered.number, "2024-FAC-002");
  }

  #[test]
  fn test_redact_clears_hidden_values() {
    let mut site = samples::worksites().remove(0);
    site.redact(&[Field::HourlyRate]);
    assert!(site.budget.is_some());
    site.redact(&[Field::WorksiteBudget]);
    assert_eq!(site.budget, None);

    let mut employee = samples::personnel().remove(0);
    employee.redact(&[Field::Revenue, Field::HourlyRate]);
    assert_eq!(employee.hourly_rate, None);
    assert_eq!(employee.name, "Yao Kouassi");
  }

  #[test]
  fn test_prefix_and_insertion() {
    assert_eq!(Collection::Personnel.id_prefix(), "EMP");
    assert_eq!(Collection::Reports.insertion(), Insertion::Prepend);
    assert_eq!(Collection::Invoices.insertion(), Insertion::Append);
    assert_eq!(Collection::Suppliers.endpoint(), "/api/fournisseurs/");
  }
}
