//! Built-in records served when neither the API nor the local store has
//! anything for a collection.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::invoice::InvoiceLine;
use super::types::{
  Client, Employee, Invoice, InvoiceStatus, Material, Report, Supplier, Worksite, WorksiteStatus,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

pub fn worksites() -> Vec<Worksite> {
  vec![
    Worksite {
      id: "CH001".into(),
      name: "Rénovation Appartement Cocody".into(),
      client: "Kouassi Traoré".into(),
      client_id: Some("CL001".into()),
      start_date: date(2024, 3, 15),
      planned_end: date(2024, 4, 30),
      budget: Some(Decimal::from(85_000)),
      status: WorksiteStatus::Active,
      progress: 75,
      site_chief: Some("Yao Kouassi".into()),
    },
    Worksite {
      id: "CH002".into(),
      name: "Construction Maison Marcory".into(),
      client: "Aïssata Koné".into(),
      client_id: Some("CL002".into()),
      start_date: date(2024, 2, 1),
      planned_end: date(2024, 5, 15),
      budget: Some(Decimal::from(120_000)),
      status: WorksiteStatus::Active,
      progress: 45,
      site_chief: None,
    },
    Worksite {
      id: "CH003".into(),
      name: "Aménagement Bureau Plateau".into(),
      client: "Abidjan Constructions SARL".into(),
      client_id: Some("CL003".into()),
      start_date: date(2024, 4, 1),
      planned_end: date(2024, 6, 30),
      budget: Some(Decimal::from(75_000)),
      status: WorksiteStatus::Planned,
      progress: 30,
      site_chief: None,
    },
  ]
}

pub fn personnel() -> Vec<Employee> {
  let employee = |id: &str, name: &str, role: &str, contact: &str, rate: i64, site: &str| Employee {
    id: id.into(),
    name: name.into(),
    role: role.into(),
    contact: contact.into(),
    hourly_rate: Some(Decimal::from(rate)),
    worksite: Some(site.into()),
    active: true,
  };

  vec![
    employee("EMP001", "Yao Kouassi", "Chef de Chantier", "yao.kouassi@abeja.ci", 45, "CH001"),
    employee("EMP002", "Aïcha Coulibaly", "Ouvrier Professionnel", "aicha.coulibaly@gmail.com", 35, "CH001"),
    employee("EMP003", "Kouame N'Dri", "Électricien", "kouame.ndri@ouvrier.ci", 40, "CH002"),
  ]
}

pub fn materials() -> Vec<Material> {
  vec![
    Material {
      id: "MAT001".into(),
      name: "Ciment".into(),
      category: "Matériaux de construction".into(),
      stock: 150,
      unit: "Sac".into(),
      alert_threshold: 20,
      unit_price: Decimal::new(850, 2),
      supplier: Some("Fournitures BTP Abidjan".into()),
    },
    Material {
      id: "MAT002".into(),
      name: "Briques".into(),
      category: "Matériaux de construction".into(),
      stock: 5,
      unit: "Palette".into(),
      alert_threshold: 10,
      unit_price: Decimal::from(120),
      supplier: Some("Matériaux Ivoire SARL".into()),
    },
    Material {
      id: "MAT003".into(),
      name: "Sable".into(),
      category: "Matériaux de construction".into(),
      stock: 80,
      unit: "m³".into(),
      alert_threshold: 15,
      unit_price: Decimal::from(45),
      supplier: None,
    },
  ]
}

pub fn clients() -> Vec<Client> {
  let client = |id: &str, name: &str, email: &str, phone: &str| Client {
    id: id.into(),
    name: name.into(),
    email: email.into(),
    phone: phone.into(),
    address: String::new(),
  };

  vec![
    client("CL001", "Kouassi Traoré", "kouassi.traore@traoreci.ci", "+225 21 23 45 67"),
    client("CL002", "Aïssata Koné", "aissata.kone@koneci.ci", "+225 27 89 01 23"),
    client("CL003", "Abidjan Constructions SARL", "contact@abidjanconstructions.ci", "+225 21 23 45 68"),
    client("CL004", "Société Ivoire BTP", "contact@societebtp.ci", "+225 21 45 67 89"),
    client("CL005", "Kone & Frères SARL", "info@konefreres.ci", "+225 27 12 34 56"),
    client("CL006", "Sika CI", "sales@sikaci.ci", "+225 21 98 76 54"),
  ]
}

pub fn suppliers() -> Vec<Supplier> {
  let supplier = |id: &str, name: &str, phone: &str, email: &str, address: &str, specialty: &str| {
    Supplier {
      id: id.into(),
      name: name.into(),
      contact: phone.into(),
      email: email.into(),
      phone: phone.into(),
      address: address.into(),
      specialty: specialty.into(),
    }
  };

  vec![
    supplier("FOU001", "Fournitures BTP Abidjan", "+225 27 33 44 55", "contact@fournituresbtp.ci", "Zone 4, Abidjan", "Matériaux de construction"),
    supplier("FOU002", "Matériaux Ivoire SARL", "+225 21 44 33 22", "vente@materiauxivoire.ci", "Marcory, Abidjan", "Gros oeuvre"),
    supplier("FOU003", "TechniBat CI", "+225 27 55 66 77", "contact@technibat.ci", "Cocody, Abidjan", "Électricité"),
  ]
}

pub fn invoices() -> Vec<Invoice> {
  let invoice = |id: &str,
                 number: &str,
                 day: NaiveDate,
                 client: (&str, &str),
                 site: &str,
                 amount: i64,
                 status: InvoiceStatus| Invoice {
    id: id.into(),
    number: number.into(),
    date: day,
    client_id: client.0.into(),
    client_name: Some(client.1.into()),
    worksite_id: Some(site.into()),
    lines: vec![InvoiceLine::new(
      "Travaux",
      Decimal::ONE,
      Decimal::from(amount),
    )],
    tax_pct: Decimal::ZERO,
    status,
  };

  vec![
    invoice("FAC001", "2024-FAC-001", date(2024, 3, 20), ("CL001", "Kouassi Traoré"), "CH001", 25_000, InvoiceStatus::Draft),
    invoice("FAC002", "2024-FAC-002", date(2024, 4, 2), ("CL002", "Aïssata Koné"), "CH002", 48_000, InvoiceStatus::Sent),
    invoice("FAC003", "2024-FAC-003", date(2024, 4, 10), ("CL003", "Abidjan Constructions SARL"), "CH003", 15_000, InvoiceStatus::Paid),
  ]
}

pub fn reports() -> Vec<Report> {
  let report = |id: &str, title: &str, day: NaiveDate, site: &str, author: &str, summary: &str| Report {
    id: id.into(),
    title: title.into(),
    date: Some(day),
    worksite: Some(site.into()),
    author: author.into(),
    summary: summary.into(),
  };

  vec![
    report("RPT001", "Rapport d'avancement - Cocody", date(2024, 4, 2), "CH001", "Yao Kouassi", "Travaux de plomberie terminés, peinture en cours. Aucun incident signalé."),
    report("RPT002", "Rapport sécurité - Marcory", date(2024, 4, 5), "CH002", "Aïcha Coulibaly", "Formation sécurité effectuée pour 12 ouvriers; équipements conformes."),
    report("RPT003", "Rapport matériel - Plateau", date(2024, 4, 10), "CH003", "Kouame N'Dri", "Approvisionnement sable prévu demain; livraison de briques en retard."),
  ]
}
