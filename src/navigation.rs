//! Page names, aliases and lookup from user input

use crate::access::{AccessGate, Page};

#[derive(Debug, Clone)]
pub struct PageEntry {
  pub page: Page,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

impl PageEntry {
  pub fn name(&self) -> &'static str {
    self.page.key()
  }
}

/// Every navigable page
pub const PAGES: &[PageEntry] = &[
  PageEntry {
    page: Page::Dashboard,
    aliases: &["d", "home", "accueil", "tableau"],
    description: "Headline figures",
  },
  PageEntry {
    page: Page::Worksites,
    aliases: &["ch", "sites", "worksites"],
    description: "Worksites and their progress",
  },
  PageEntry {
    page: Page::Personnel,
    aliases: &["p", "staff", "employes", "employees"],
    description: "Employees and hourly rates",
  },
  PageEntry {
    page: Page::Materials,
    aliases: &["m", "mat", "stock", "materials"],
    description: "Material stock and alert thresholds",
  },
  PageEntry {
    page: Page::Invoices,
    aliases: &["f", "factures", "devis", "invoices"],
    description: "Quotes and invoices",
  },
  PageEntry {
    page: Page::Reports,
    aliases: &["r", "reports"],
    description: "Daily worksite reports",
  },
  PageEntry {
    page: Page::Suppliers,
    aliases: &["fo", "suppliers"],
    description: "Suppliers",
  },
  PageEntry {
    page: Page::Clients,
    aliases: &["cl", "customers"],
    description: "Clients",
  },
];

/// Entries for the pages `gate` lets through, in the role's menu order.
pub fn pages_for(gate: &AccessGate) -> Vec<&'static PageEntry> {
  gate
    .allowed_pages()
    .iter()
    .filter_map(|page| PAGES.iter().find(|entry| entry.page == *page))
    .collect()
}

/// Input that names no page, with the closest candidates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page '{input}'")]
pub struct UnknownPage {
  pub input: String,
  pub suggestions: Vec<Page>,
}

fn ranked(input: &str) -> Vec<(&'static PageEntry, u32)> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return PAGES.iter().map(|entry| (entry, 0)).collect();
  }

  let mut matches: Vec<(&PageEntry, u32)> = Vec::new();

  for entry in PAGES {
    let name = entry.name();
    let rank = if name == input_lower {
      0
    } else if entry.aliases.contains(&input_lower.as_str()) {
      1
    } else if name.starts_with(&input_lower) {
      2
    } else if entry.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if name.contains(&input_lower) {
      4
    } else if entry.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((entry, rank));
  }

  // Stable, so table order breaks ties
  matches.sort_by_key(|(_, rank)| *rank);
  matches
}

/// Pages matching `input`, best first. Empty input lists every page.
pub fn get_suggestions(input: &str) -> Vec<&'static PageEntry> {
  ranked(input).into_iter().map(|(entry, _)| entry).collect()
}

/// Resolve `input` to a page when one candidate ranks strictly best.
pub fn resolve_page(input: &str) -> Result<Page, UnknownPage> {
  let matches = ranked(input);

  match matches.as_slice() {
    [(only, _)] => return Ok(only.page),
    [(best, best_rank), (_, next_rank), ..] if best_rank < next_rank => return Ok(best.page),
    _ => {}
  }

  Err(UnknownPage {
    input: input.to_string(),
    suggestions: matches.into_iter().map(|(entry, _)| entry.page).collect(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), PAGES.len());
  }

  #[test]
  fn test_exact_match() {
    assert_eq!(get_suggestions("rapports")[0].page, Page::Reports);
    assert_eq!(resolve_page("devis-factures"), Ok(Page::Invoices));
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(resolve_page("factures"), Ok(Page::Invoices));
    assert_eq!(resolve_page("Suppliers"), Ok(Page::Suppliers));
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(resolve_page("four"), Ok(Page::Suppliers));
    assert_eq!(resolve_page("cli"), Ok(Page::Clients));
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("tiers");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].page, Page::Worksites);
  }

  #[test]
  fn test_ambiguous_input_is_not_resolved() {
    let err = resolve_page("s").unwrap_err();
    assert!(err.suggestions.contains(&Page::Worksites));
    assert!(err.suggestions.contains(&Page::Suppliers));
  }

  #[test]
  fn test_unknown_input() {
    let err = resolve_page("comptabilite").unwrap_err();
    assert!(err.suggestions.is_empty());
    assert_eq!(err.to_string(), "unknown page 'comptabilite'");
  }

  #[test]
  fn test_pages_for_role() {
    let entries = pages_for(&AccessGate::new(crate::access::Role::Worker));
    let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["rapports", "chantiers"]);
    assert_eq!(entries[0].description, "Daily worksite reports");
  }

  #[test]
  fn test_every_page_listed_once() {
    for page in Page::ALL {
      assert_eq!(PAGES.iter().filter(|e| e.page == page).count(), 1);
    }
  }
}
