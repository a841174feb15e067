use serde::{Deserialize, Serialize};

/// Page sizes offered by the listing view
pub const PAGE_SIZE_OPTIONS: &[u32] = &[10, 20, 30, 50, 100];

/// Page size used when nothing else is configured
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// A single bank branch, keyed by IFSC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
  pub ifsc: String,
  pub bank: String,
  pub branch: String,
  pub address: String,
  pub city: String,
  pub district: String,
  pub state: String,
}

/// Server-side listing parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
  /// Free-text search term (may be empty)
  pub q: String,
  pub limit: u32,
  pub offset: u32,
}

impl ListQuery {
  pub fn new(q: impl Into<String>, limit: u32, offset: u32) -> Self {
    Self {
      q: q.into(),
      limit,
      offset,
    }
  }
}

/// One page of listing results
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BranchPage {
  /// Total matching records on the server
  pub count: u64,
  pub items: Vec<Branch>,
}
