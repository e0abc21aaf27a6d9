//! Invoice line items and derived totals.
//!
//! Totals are never stored: every call recomputes them from the lines, so
//! adding or removing a line is immediately reflected.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::types::Invoice;

/// Decimal places kept on computed amounts
const CURRENCY_DP: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
  pub description: String,
  pub quantity: Decimal,
  pub unit_price: Decimal,
}

impl InvoiceLine {
  pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
    Self {
      description: description.into(),
      quantity,
      unit_price,
    }
  }

  pub fn total(&self) -> Decimal {
    self.quantity * self.unit_price
  }
}

impl Invoice {
  pub fn subtotal(&self) -> Decimal {
    self.lines.iter().map(InvoiceLine::total).sum()
  }

  pub fn tax_amount(&self) -> Decimal {
    (self.subtotal() * self.tax_pct / Decimal::ONE_HUNDRED)
      .round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
  }

  pub fn total(&self) -> Decimal {
    self.subtotal() + self.tax_amount()
  }

  pub fn push_line(&mut self, line: InvoiceLine) {
    self.lines.push(line);
  }

  /// Remove the line at `index`, if there is one.
  pub fn remove_line(&mut self, index: usize) -> Option<InvoiceLine> {
    (index < self.lines.len()).then(|| self.lines.remove(index))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::types::InvoiceStatus;
  use chrono::NaiveDate;

  fn invoice(lines: Vec<InvoiceLine>, tax_pct: i64) -> Invoice {
    Invoice {
      id: String::new(),
      number: String::new(),
      date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
      client_id: "CL001".to_string(),
      client_name: None,
      worksite_id: Some("CH001".to_string()),
      lines,
      tax_pct: Decimal::from(tax_pct),
      status: InvoiceStatus::Draft,
    }
  }

  #[test]
  fn test_totals_with_tax() {
    let inv = invoice(
      vec![
        InvoiceLine::new("Ciment", Decimal::from(2), Decimal::from(500)),
        InvoiceLine::new("Main d'oeuvre", Decimal::from(1), Decimal::from(300)),
      ],
      18,
    );

    assert_eq!(inv.subtotal(), Decimal::from(1300));
    assert_eq!(inv.tax_amount(), Decimal::from(234));
    assert_eq!(inv.total(), Decimal::from(1534));
  }

  #[test]
  fn test_totals_follow_line_changes() {
    let mut inv = invoice(
      vec![InvoiceLine::new("Sable", Decimal::from(3), Decimal::from(45))],
      10,
    );
    assert_eq!(inv.total(), Decimal::new(14850, 2));

    inv.push_line(InvoiceLine::new("Briques", Decimal::from(1), Decimal::from(120)));
    assert_eq!(inv.subtotal(), Decimal::from(255));

    let removed = inv.remove_line(0).unwrap();
    assert_eq!(removed.description, "Sable");
    assert_eq!(inv.subtotal(), Decimal::from(120));
    assert_eq!(inv.total(), Decimal::from(132));
    assert!(inv.remove_line(5).is_none());
  }

  #[test]
  fn test_fractional_quantities_are_exact() {
    let inv = invoice(
      vec![InvoiceLine::new("Peinture", Decimal::new(25, 1), Decimal::new(850, 2))],
      0,
    );
    assert_eq!(inv.subtotal(), Decimal::new(2125, 2));
    assert_eq!(inv.tax_amount(), Decimal::ZERO);
  }

  #[test]
  fn test_tax_rounds_to_currency_precision() {
    let inv = invoice(
      vec![InvoiceLine::new("Divers", Decimal::from(1), Decimal::new(333, 2))],
      18,
    );
    // 3.33 * 18% = 0.5994
    assert_eq!(inv.tax_amount(), Decimal::new(60, 2));
  }

  #[test]
  fn test_totals_are_not_serialized() {
    let inv = invoice(
      vec![InvoiceLine::new("Ciment", Decimal::from(2), Decimal::from(500))],
      18,
    );
    let json = serde_json::to_value(&inv).unwrap();
    assert!(json.get("total").is_none());
    assert!(json.get("subtotal").is_none());
  }
}
