//! Client-side narrowing of an already-fetched page.
//!
//! Never fetches, never widens: the output is always a subset of the input,
//! in the same order.

use super::types::Branch;

/// Text filter plus the active city selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchFilter {
  /// Substring matched case-insensitively against every text field
  pub text: String,
  /// Selected city; empty means no city scoping
  pub city: String,
}

impl BranchFilter {
  pub fn new(text: impl Into<String>, city: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      city: city.into(),
    }
  }

  pub fn matches(&self, branch: &Branch) -> bool {
    let needle = self.text.to_lowercase();
    let fields = [
      &branch.state,
      &branch.branch,
      &branch.bank,
      &branch.address,
      &branch.ifsc,
      &branch.city,
      &branch.district,
    ];
    let text_match = fields
      .iter()
      .any(|field| field.to_lowercase().contains(&needle));

    if self.city.is_empty() {
      text_match
    } else {
      text_match && branch.city.to_lowercase() == self.city.to_lowercase()
    }
  }

  pub fn apply<'a>(&self, branches: &'a [Branch]) -> Vec<&'a Branch> {
    branches.iter().filter(|b| self.matches(b)).collect()
  }
}
