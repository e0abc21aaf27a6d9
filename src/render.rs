//! Plain-text rendering of page views for the terminal.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::access::{Action, Field};
use crate::cache::CacheOutcome;
use crate::domain::{Client, DashboardStats, Employee, Invoice, Material, Report, Supplier, Worksite};
use crate::session::{PageContent, PageView};

const SUMMARY_WIDTH: usize = 60;

/// Truncate to `max_chars` characters, ending with "..." if anything was cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
  if s.chars().count() <= max_chars {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// `85 000 FCFA`: whole francs with space-separated thousands.
pub fn format_currency(amount: Decimal) -> String {
  let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
  let digits = rounded.abs().trunc().to_string();

  let mut grouped = String::new();
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(' ');
    }
    grouped.push(ch);
  }

  let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
    "-"
  } else {
    ""
  };
  format!("{}{} FCFA", sign, grouped)
}

pub fn format_date(date: NaiveDate) -> String {
  date.format("%d/%m/%Y").to_string()
}

fn optional_currency(amount: Option<Decimal>) -> String {
  amount.map(format_currency).unwrap_or_else(|| "-".to_string())
}

fn optional_date(date: Option<NaiveDate>) -> String {
  date.map(format_date).unwrap_or_else(|| "-".to_string())
}

struct Column {
  header: &'static str,
  cells: Vec<String>,
}

impl Column {
  fn new<T>(header: &'static str, rows: &[T], cell: impl Fn(&T) -> String) -> Self {
    Self {
      header,
      cells: rows.iter().map(cell).collect(),
    }
  }
}

fn table(columns: Vec<Column>) -> String {
  let widths: Vec<usize> = columns
    .iter()
    .map(|c| {
      c.cells
        .iter()
        .map(|cell| cell.chars().count())
        .chain(std::iter::once(c.header.chars().count()))
        .max()
        .unwrap_or(0)
    })
    .collect();

  let pad = |text: &str, width: usize| {
    let fill = width.saturating_sub(text.chars().count());
    format!("{}{}", text, " ".repeat(fill))
  };
  let line = |cells: Vec<&str>| {
    cells
      .iter()
      .zip(&widths)
      .map(|(cell, width)| pad(cell, *width))
      .collect::<Vec<_>>()
      .join("  ")
      .trim_end()
      .to_string()
  };

  let rows = columns.first().map_or(0, |c| c.cells.len());
  let mut out = vec![line(columns.iter().map(|c| c.header).collect())];
  for row in 0..rows {
    out.push(line(columns.iter().map(|c| c.cells[row].as_str()).collect()));
  }
  out.join("\n")
}

fn worksites(rows: &[Worksite], hidden: &[Field]) -> String {
  let mut columns = vec![
    Column::new("ID", rows, |w| w.id.clone()),
    Column::new("Nom", rows, |w| w.name.clone()),
    Column::new("Client", rows, |w| w.client.clone()),
    Column::new("Début", rows, |w| format_date(w.start_date)),
    Column::new("Fin prévue", rows, |w| format_date(w.planned_end)),
  ];
  if !hidden.contains(&Field::WorksiteBudget) {
    columns.push(Column::new("Budget", rows, |w| optional_currency(w.budget)));
  }
  columns.push(Column::new("Statut", rows, |w| w.status.label().to_string()));
  columns.push(Column::new("Avancement", rows, |w| format!("{}%", w.progress)));
  table(columns)
}

fn personnel(rows: &[Employee], hidden: &[Field]) -> String {
  let mut columns = vec![
    Column::new("ID", rows, |e| e.id.clone()),
    Column::new("Nom", rows, |e| e.name.clone()),
    Column::new("Rôle", rows, |e| e.role.clone()),
    Column::new("Contact", rows, |e| e.contact.clone()),
  ];
  if !hidden.contains(&Field::HourlyRate) {
    columns.push(Column::new("Taux horaire", rows, |e| optional_currency(e.hourly_rate)));
  }
  columns.push(Column::new("Chantier", rows, |e| e.worksite.clone().unwrap_or_default()));
  columns.push(Column::new("Actif", rows, |e| {
    let active = if e.active { "oui" } else { "non" };
    active.to_string()
  }));
  table(columns)
}

fn materials(rows: &[Material]) -> String {
  table(vec![
    Column::new("ID", rows, |m| m.id.clone()),
    Column::new("Nom", rows, |m| m.name.clone()),
    Column::new("Catégorie", rows, |m| m.category.clone()),
    Column::new("Stock", rows, |m| format!("{} {}", m.stock, m.unit)),
    Column::new("Seuil", rows, |m| m.alert_threshold.to_string()),
    Column::new("Prix unitaire", rows, |m| format_currency(m.unit_price)),
    Column::new("Alerte", rows, |m| {
      let alert = if m.below_threshold() { "stock bas" } else { "" };
      alert.to_string()
    }),
  ])
}

fn invoices(rows: &[Invoice]) -> String {
  table(vec![
    Column::new("N°", rows, |f| f.number.clone()),
    Column::new("Date", rows, |f| format_date(f.date)),
    Column::new("Client", rows, |f| {
      f.client_name.clone().unwrap_or_else(|| f.client_id.clone())
    }),
    Column::new("Total TTC", rows, |f| format_currency(f.total())),
    Column::new("Statut", rows, |f| f.status.label().to_string()),
  ])
}

fn reports(rows: &[Report]) -> String {
  table(vec![
    Column::new("ID", rows, |r| r.id.clone()),
    Column::new("Date", rows, |r| optional_date(r.date)),
    Column::new("Titre", rows, |r| r.title.clone()),
    Column::new("Chantier", rows, |r| r.worksite.clone().unwrap_or_default()),
    Column::new("Auteur", rows, |r| r.author.clone()),
    Column::new("Résumé", rows, |r| truncate(&r.summary, SUMMARY_WIDTH)),
  ])
}

fn suppliers(rows: &[Supplier]) -> String {
  table(vec![
    Column::new("ID", rows, |s| s.id.clone()),
    Column::new("Nom", rows, |s| s.name.clone()),
    Column::new("Spécialité", rows, |s| s.specialty.clone()),
    Column::new("Contact", rows, |s| s.contact.clone()),
    Column::new("Email", rows, |s| s.email.clone()),
  ])
}

fn clients(rows: &[Client]) -> String {
  table(vec![
    Column::new("ID", rows, |c| c.id.clone()),
    Column::new("Nom", rows, |c| c.name.clone()),
    Column::new("Email", rows, |c| c.email.clone()),
    Column::new("Téléphone", rows, |c| c.phone.clone()),
  ])
}

fn dashboard(stats: &DashboardStats) -> String {
  let mut lines = vec![
    format!("Chantiers actifs      : {}", stats.active_worksites),
    format!("Personnel             : {}", stats.personnel),
    format!("Matériaux en stock    : {}", stats.materials),
  ];
  if let Some(revenue) = stats.monthly_revenue {
    lines.push(format!("Facturé ce mois       : {}", format_currency(revenue)));
  }
  lines.join("\n")
}

fn actions(actions: &[Action]) -> Option<String> {
  if actions.is_empty() {
    return None;
  }
  let names: Vec<&str> = actions
    .iter()
    .map(|action| match action {
      Action::Create(_) => "ajouter",
      Action::Delete(_) => "supprimer",
    })
    .collect();
  Some(format!("Actions : {}", names.join(", ")))
}

/// Full text of a page: title, body honouring hidden fields, offered actions.
pub fn render_view(view: &PageView) -> String {
  let mut title = format!("== {} ==", view.page.title());
  if view.content.is_stale() {
    title.push_str(" (données hors ligne)");
  }

  let body = match &view.content {
    CacheOutcome::Unavailable => "Aucune donnée disponible.".to_string(),
    CacheOutcome::Fresh(content) | CacheOutcome::Stale(content) if content.is_empty() => {
      "Aucun résultat.".to_string()
    }
    CacheOutcome::Fresh(content) | CacheOutcome::Stale(content) => match content {
      PageContent::Dashboard(stats) => dashboard(stats),
      PageContent::Worksites(rows) => worksites(rows, &view.hidden),
      PageContent::Personnel(rows) => personnel(rows, &view.hidden),
      PageContent::Materials(rows) => materials(rows),
      PageContent::Invoices(rows) => invoices(rows),
      PageContent::Reports(rows) => reports(rows),
      PageContent::Suppliers(rows) => suppliers(rows),
      PageContent::Clients(rows) => clients(rows),
    },
  };

  let mut out = vec![title, body];
  out.extend(actions(&view.actions));
  out.join("\n\n")
}
