//! Canonical record shapes held by the cache and the local store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::invoice::InvoiceLine;

/// Lifecycle of a worksite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorksiteStatus {
  #[serde(alias = "planifie", alias = "pending")]
  Planned,
  #[serde(alias = "en_cours")]
  Active,
  #[serde(alias = "suspendu")]
  Suspended,
  #[serde(alias = "termine")]
  Completed,
  #[serde(alias = "annule")]
  Cancelled,
}

impl WorksiteStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Planned => "planned",
      Self::Active => "active",
      Self::Suspended => "suspended",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }

  /// Text shown to users
  pub fn label(self) -> &'static str {
    match self {
      Self::Planned => "Planifié",
      Self::Active => "En Cours",
      Self::Suspended => "Suspendu",
      Self::Completed => "Terminé",
      Self::Cancelled => "Annulé",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
  #[serde(alias = "brouillon", alias = "pending")]
  Draft,
  #[serde(alias = "envoyee", alias = "active")]
  Sent,
  #[serde(alias = "payee", alias = "completed")]
  Paid,
  #[serde(alias = "annulee")]
  Cancelled,
}

impl InvoiceStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Sent => "sent",
      Self::Paid => "paid",
      Self::Cancelled => "cancelled",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Draft => "Brouillon",
      Self::Sent => "Envoyée",
      Self::Paid => "Payée",
      Self::Cancelled => "Annulée",
    }
  }
}

/// A construction site (chantier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Worksite {
  #[serde(default)]
  pub id: String,
  #[validate(length(min = 1, message = "worksite name is required"))]
  pub name: String,
  /// Client display name
  #[validate(length(min = 1, message = "client is required"))]
  pub client: String,
  #[serde(default)]
  pub client_id: Option<String>,
  pub start_date: NaiveDate,
  pub planned_end: NaiveDate,
  /// `None` when hidden from the viewing role
  #[serde(default)]
  pub budget: Option<Decimal>,
  pub status: WorksiteStatus,
  /// Percentage, 0 to 100
  #[validate(range(max = 100, message = "progress must be between 0 and 100"))]
  pub progress: u8,
  #[serde(default)]
  pub site_chief: Option<String>,
}

impl Worksite {
  pub fn new(
    name: impl Into<String>,
    client: impl Into<String>,
    start_date: NaiveDate,
    planned_end: NaiveDate,
    budget: Decimal,
  ) -> Self {
    Self {
      id: String::new(),
      name: name.into(),
      client: client.into(),
      client_id: None,
      start_date,
      planned_end,
      budget: Some(budget),
      status: WorksiteStatus::Planned,
      progress: 0,
      site_chief: None,
    }
  }
}

/// A member of staff (personnel)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Employee {
  #[serde(default)]
  pub id: String,
  #[validate(length(min = 1, message = "name is required"))]
  pub name: String,
  /// Role label, e.g. "Chef de Chantier"
  pub role: String,
  #[serde(default)]
  pub contact: String,
  /// `None` when hidden from the viewing role
  #[serde(default)]
  pub hourly_rate: Option<Decimal>,
  /// Assigned worksite, if any
  #[serde(default)]
  pub worksite: Option<String>,
  #[serde(default = "default_true")]
  pub active: bool,
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Material {
  #[serde(default)]
  pub id: String,
  #[validate(length(min = 1, message = "material name is required"))]
  pub name: String,
  #[serde(default)]
  pub category: String,
  pub stock: i64,
  pub unit: String,
  pub alert_threshold: i64,
  pub unit_price: Decimal,
  #[serde(default)]
  pub supplier: Option<String>,
}

impl Material {
  /// Stock at or under the alert threshold.
  pub fn below_threshold(&self) -> bool {
    self.stock <= self.alert_threshold
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Client {
  #[serde(default)]
  pub id: String,
  #[validate(length(min = 1, message = "client name is required"))]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Supplier {
  #[serde(default)]
  pub id: String,
  #[validate(length(min = 1, message = "supplier name is required"))]
  pub name: String,
  #[serde(default)]
  pub contact: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub specialty: String,
}

/// An invoice (facture). Totals are derived from `lines` and `tax_pct`, see
/// the methods in `invoice.rs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Invoice {
  #[serde(default)]
  pub id: String,
  /// Generated on insert when left empty
  #[serde(default)]
  pub number: String,
  pub date: NaiveDate,
  #[validate(length(min = 1, message = "client is required"))]
  pub client_id: String,
  #[serde(default)]
  pub client_name: Option<String>,
  #[serde(default)]
  #[validate(required(message = "worksite is required"))]
  pub worksite_id: Option<String>,
  #[validate(length(min = 1, message = "add at least one line to the invoice"))]
  pub lines: Vec<InvoiceLine>,
  #[serde(default)]
  pub tax_pct: Decimal,
  pub status: InvoiceStatus,
}

/// A daily site report (rapport)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Report {
  #[serde(default)]
  pub id: String,
  #[validate(length(min = 1, message = "title is required"))]
  pub title: String,
  /// Unknown for remote reports carrying neither a date nor a timestamp
  #[serde(default)]
  pub date: Option<NaiveDate>,
  #[serde(default)]
  #[validate(required(message = "worksite is required"))]
  pub worksite: Option<String>,
  #[validate(length(min = 1, message = "author is required"))]
  pub author: String,
  #[serde(default)]
  pub summary: String,
}

impl Report {
  pub fn new(
    title: impl Into<String>,
    date: NaiveDate,
    worksite: impl Into<String>,
    author: impl Into<String>,
    summary: impl Into<String>,
  ) -> Self {
    Self {
      id: String::new(),
      title: title.into(),
      date: Some(date),
      worksite: Some(worksite.into()),
      author: author.into(),
      summary: summary.into(),
    }
  }
}

/// Headline figures for the dashboard page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
  pub active_worksites: u64,
  pub personnel: u64,
  pub materials: u64,
  /// `None` once redacted for a role that may not see revenue
  pub monthly_revenue: Option<Decimal>,
}
