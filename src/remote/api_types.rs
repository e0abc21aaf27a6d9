//! Serde-deserializable types matching the back-office API responses.
//!
//! These are separate from the domain records so the wire shape (nested
//! objects, numeric ids, French field names) stays at the boundary. Each
//! type converts into its canonical record with a pure function.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::{
  Client, DashboardStats, Employee, Invoice, InvoiceLine, InvoiceStatus, Material, Report,
  Supplier, Worksite, WorksiteStatus,
};
use crate::error::FetchError;

/// Maximum length of a report summary derived from its full content
const SUMMARY_CHARS: usize = 200;

/// Ids arrive as numbers from the API and as strings from older payloads.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Num(i64),
    Str(String),
  }

  Ok(match RawId::deserialize(deserializer)? {
    RawId::Num(n) => n.to_string(),
    RawId::Str(s) => s,
  })
}

// ============================================================================
// Common nested field types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiRef {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub nom: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  #[serde(default)]
  pub full_name: String,
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub email: String,
}

impl ApiUser {
  fn display_name(self) -> String {
    if self.full_name.trim().is_empty() {
      self.username
    } else {
      self.full_name
    }
  }
}

// ============================================================================
// Collection items
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiWorksite {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub nom: String,
  pub client: ApiRef,
  pub date_debut: NaiveDate,
  pub date_fin_prevue: NaiveDate,
  pub budget: Decimal,
  pub statut: WorksiteStatus,
  #[serde(default)]
  pub avancement: u8,
  pub chef_chantier: Option<ApiRef>,
}

#[derive(Debug, Deserialize)]
pub struct ApiEmployee {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub user: ApiUser,
  #[serde(default)]
  pub role_display: String,
  pub taux_horaire: Decimal,
  pub chantier_actuel: Option<ApiRef>,
  #[serde(default = "default_true")]
  pub est_actif: bool,
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Deserialize)]
pub struct ApiMaterial {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub nom: String,
  #[serde(default)]
  pub categorie_display: String,
  #[serde(default)]
  pub unite: String,
  pub quantite_stock: i64,
  #[serde(default)]
  pub seuil_minimum: i64,
  pub prix_unitaire: Decimal,
  pub fournisseur: Option<ApiRef>,
}

#[derive(Debug, Deserialize)]
pub struct ApiClient {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub nom: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub telephone: String,
  #[serde(default)]
  pub adresse: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiSupplier {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub nom: String,
  #[serde(default)]
  pub contact: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub telephone: String,
  #[serde(default)]
  pub adresse: String,
  #[serde(default)]
  pub specialite: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiInvoiceLine {
  #[serde(default)]
  pub description: String,
  pub quantite: Decimal,
  pub prix_unitaire: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ApiInvoice {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub numero: Option<String>,
  pub client: ApiRef,
  pub chantier: Option<ApiRef>,
  pub date: NaiveDate,
  pub statut: InvoiceStatus,
  #[serde(default)]
  pub tva_pct: Decimal,
  #[serde(default)]
  pub lignes: Vec<ApiInvoiceLine>,
}

#[derive(Debug, Deserialize)]
pub struct ApiReport {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub titre: String,
  pub date: Option<NaiveDate>,
  pub created_at: Option<chrono::DateTime<chrono::FixedOffset>>,
  pub auteur: Option<ApiUser>,
  #[serde(default)]
  pub contenu: String,
  pub chantier: Option<ApiRef>,
}

// ============================================================================
// Dashboard aggregate
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ApiCount {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub actifs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiFinances {
  #[serde(default)]
  pub factures_mois: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ApiDashboard {
  pub chantiers: ApiCount,
  pub personnel: ApiCount,
  pub materiaux: ApiCount,
  #[serde(default)]
  pub finances: ApiFinances,
}

// ============================================================================
// Session bootstrap
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiCsrf {
  pub csrftoken: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiCurrentUser {
  pub username: String,
  #[serde(default)]
  pub full_name: String,
  #[serde(default)]
  pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiSubmitResponse {
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub error: Option<String>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiWorksite> for Worksite {
  fn from(w: ApiWorksite) -> Self {
    Worksite {
      id: w.id,
      name: w.nom,
      client: w.client.nom,
      client_id: Some(w.client.id),
      start_date: w.date_debut,
      planned_end: w.date_fin_prevue,
      budget: Some(w.budget),
      status: w.statut,
      progress: w.avancement.min(100),
      site_chief: w.chef_chantier.map(|c| c.nom),
    }
  }
}

impl From<ApiEmployee> for Employee {
  fn from(e: ApiEmployee) -> Self {
    let contact = e.user.email.clone();
    Employee {
      id: e.id,
      name: e.user.display_name(),
      role: e.role_display,
      contact,
      hourly_rate: Some(e.taux_horaire),
      worksite: e.chantier_actuel.map(|c| c.nom),
      active: e.est_actif,
    }
  }
}

impl From<ApiMaterial> for Material {
  fn from(m: ApiMaterial) -> Self {
    Material {
      id: m.id,
      name: m.nom,
      category: m.categorie_display,
      stock: m.quantite_stock,
      unit: m.unite,
      alert_threshold: m.seuil_minimum,
      unit_price: m.prix_unitaire,
      supplier: m.fournisseur.map(|f| f.nom),
    }
  }
}

impl From<ApiClient> for Client {
  fn from(c: ApiClient) -> Self {
    Client {
      id: c.id,
      name: c.nom,
      email: c.email,
      phone: c.telephone,
      address: c.adresse,
    }
  }
}

impl From<ApiSupplier> for Supplier {
  fn from(s: ApiSupplier) -> Self {
    Supplier {
      id: s.id,
      name: s.nom,
      contact: s.contact,
      email: s.email,
      phone: s.telephone,
      address: s.adresse,
      specialty: s.specialite,
    }
  }
}

impl From<ApiInvoice> for Invoice {
  fn from(f: ApiInvoice) -> Self {
    Invoice {
      id: f.id,
      number: f.numero.unwrap_or_default(),
      date: f.date,
      client_id: f.client.id,
      client_name: Some(f.client.nom),
      worksite_id: f.chantier.map(|c| c.id),
      lines: f
        .lignes
        .into_iter()
        .map(|l| InvoiceLine::new(l.description, l.quantite, l.prix_unitaire))
        .collect(),
      tax_pct: f.tva_pct,
      status: f.statut,
    }
  }
}

impl From<ApiReport> for Report {
  fn from(r: ApiReport) -> Self {
    Report {
      id: r.id,
      title: r.titre,
      date: r.date.or_else(|| r.created_at.map(|ts| ts.date_naive())),
      worksite: r.chantier.map(|c| c.nom),
      author: r.auteur.map(ApiUser::display_name).unwrap_or_default(),
      summary: r.contenu.chars().take(SUMMARY_CHARS).collect(),
    }
  }
}

impl From<ApiDashboard> for DashboardStats {
  fn from(d: ApiDashboard) -> Self {
    DashboardStats {
      active_worksites: d.chantiers.actifs,
      personnel: d.personnel.total,
      materials: d.materiaux.total,
      monthly_revenue: Some(d.finances.factures_mois),
    }
  }
}

// ============================================================================
// Envelope decoding
// ============================================================================

/// Pull the array stored under `key` out of a `{ "<key>": [...] }` envelope
/// and decode every item. Any malformed item rejects the whole payload.
pub fn decode_envelope<W, T>(key: &str, body: Value) -> Result<Vec<T>, FetchError>
where
  W: serde::de::DeserializeOwned + Into<T>,
{
  let Value::Object(mut map) = body else {
    return Err(FetchError::Malformed("expected a JSON object".to_string()));
  };

  let items = match map.remove(key) {
    Some(Value::Array(items)) => items,
    Some(_) => return Err(FetchError::Malformed(format!("'{}' is not an array", key))),
    None => return Err(FetchError::Malformed(format!("missing '{}' field", key))),
  };

  items
    .into_iter()
    .enumerate()
    .map(|(index, item)| {
      serde_json::from_value::<W>(item)
        .map(Into::into)
        .map_err(|e| FetchError::Malformed(format!("{}[{}]: {}", key, index, e)))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_worksite_flattens_nested_client() {
    let body = json!({
      "chantiers": [{
        "id": 7,
        "nom": "Construction Maison Marcory",
        "client": { "id": 2, "nom": "Aïssata Koné" },
        "description": "",
        "date_debut": "2024-02-01",
        "date_fin_prevue": "2024-05-15",
        "budget": 120000.0,
        "statut": "en_cours",
        "statut_display": "En Cours",
        "avancement": 45,
        "chef_chantier": { "id": 3, "nom": "Yao Kouassi" },
        "created_at": "2024-01-20T10:00:00+00:00"
      }]
    });

    let sites: Vec<Worksite> = decode_envelope::<ApiWorksite, _>("chantiers", body).unwrap();
    assert_eq!(sites.len(), 1);
    let site = &sites[0];
    assert_eq!(site.id, "7");
    assert_eq!(site.client, "Aïssata Koné");
    assert_eq!(site.client_id.as_deref(), Some("2"));
    assert_eq!(site.status, WorksiteStatus::Active);
    assert_eq!(site.budget, Some(Decimal::from(120000)));
    assert_eq!(site.site_chief.as_deref(), Some("Yao Kouassi"));
  }

  #[test]
  fn test_employee_takes_user_fields() {
    let body = json!({
      "personnel": [{
        "id": 1,
        "user": { "id": 9, "username": "ykouassi", "full_name": "", "email": "yao@abeja.ci" },
        "role": "chef_chantier",
        "role_display": "Chef de Chantier",
        "taux_horaire": 45.0,
        "chantier_actuel": null,
        "est_actif": false
      }]
    });

    let staff: Vec<Employee> = decode_envelope::<ApiEmployee, _>("personnel", body).unwrap();
    assert_eq!(staff[0].name, "ykouassi");
    assert_eq!(staff[0].contact, "yao@abeja.ci");
    assert_eq!(staff[0].worksite, None);
    assert!(!staff[0].active);
  }

  #[test]
  fn test_report_summary_is_truncated() {
    let long = "é".repeat(250);
    let body = json!({
      "rapports": [{
        "id": 4,
        "titre": "Rapport sécurité",
        "date": null,
        "created_at": "2024-04-05T08:30:00+00:00",
        "auteur": { "id": 1, "full_name": "Aïcha Coulibaly" },
        "contenu": long,
        "chantier": { "id": 2, "nom": "Marcory" }
      }]
    });

    let reports: Vec<Report> = decode_envelope::<ApiReport, _>("rapports", body).unwrap();
    assert_eq!(reports[0].summary.chars().count(), 200);
    assert_eq!(reports[0].date, NaiveDate::from_ymd_opt(2024, 4, 5));
    assert_eq!(reports[0].worksite.as_deref(), Some("Marcory"));
  }

  #[test]
  fn test_report_without_any_date() {
    let body = json!({
      "rapports": [{
        "id": 5,
        "titre": "Livraison ciment",
        "date": null,
        "created_at": null,
        "auteur": null,
        "chantier": null
      }]
    });

    let reports: Vec<Report> = decode_envelope::<ApiReport, _>("rapports", body).unwrap();
    assert_eq!(reports[0].date, None);
    assert_eq!(reports[0].author, "");
  }

  #[test]
  fn test_invoice_lines_and_status() {
    let body = json!({
      "factures": [{
        "id": 3,
        "numero": "2024-FAC-003",
        "client": { "id": 1, "nom": "Kouassi Traoré" },
        "date": "2024-04-10",
        "total": 1534.0,
        "statut": "payee",
        "tva_pct": 18,
        "lignes": [
          { "id": 1, "description": "Ciment", "quantite": 2, "prix_unitaire": 500.0, "montant": 1000.0 },
          { "id": 2, "description": "Pose", "quantite": 1, "prix_unitaire": 300.0, "montant": 300.0 }
        ]
      }]
    });

    let invoices: Vec<Invoice> = decode_envelope::<ApiInvoice, _>("factures", body).unwrap();
    let inv = &invoices[0];
    assert_eq!(inv.status, InvoiceStatus::Paid);
    assert_eq!(inv.client_name.as_deref(), Some("Kouassi Traoré"));
    assert_eq!(inv.total(), Decimal::from(1534));
  }

  #[test]
  fn test_missing_key_is_malformed() {
    let result = decode_envelope::<ApiClient, Client>("clients", json!({ "items": [] }));
    assert!(matches!(result, Err(FetchError::Malformed(_))));
  }

  #[test]
  fn test_one_bad_item_rejects_payload() {
    let body = json!({
      "clients": [
        { "id": 1, "nom": "Sika CI" },
        { "id": 2 }
      ]
    });
    let result = decode_envelope::<ApiClient, Client>("clients", body);
    assert!(matches!(result, Err(FetchError::Malformed(msg)) if msg.starts_with("clients[1]")));
  }

  #[test]
  fn test_dashboard_nested_stats() {
    let body = json!({
      "chantiers": { "total": 5, "actifs": 3, "termines": 1 },
      "personnel": { "total": 12 },
      "materiaux": { "total": 40, "en_rupture": 2 },
      "clients": { "total": 6 },
      "finances": { "factures_mois": 48000.0, "budget_total": 280000.0 }
    });
    let stats: DashboardStats = serde_json::from_value::<ApiDashboard>(body).unwrap().into();
    assert_eq!(stats.active_worksites, 3);
    assert_eq!(stats.personnel, 12);
    assert_eq!(stats.materials, 40);
    assert_eq!(stats.monthly_revenue, Some(Decimal::from(48000)));
  }
}
