//! Cache keys for branch lookups.

use sha2::{Digest, Sha256};

use super::types::ListQuery;

/// Logical request, reduced to what identifies its response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchQueryKey {
  /// A page of the listing
  List { q: String, limit: u32, offset: u32 },
  /// A single branch by IFSC
  Detail { ifsc: String },
}

impl BranchQueryKey {
  pub fn list(query: &ListQuery) -> Self {
    Self::List {
      q: query.q.clone(),
      limit: query.limit,
      offset: query.offset,
    }
  }

  pub fn detail(ifsc: &str) -> Self {
    Self::Detail {
      ifsc: ifsc.to_string(),
    }
  }

  /// Request path the key stands for. Values are percent-encoded so a `&`
  /// inside `q` cannot collide with the parameter separator.
  fn canonical(&self) -> String {
    match self {
      Self::List { q, limit, offset } => {
        let params = url::form_urlencoded::Serializer::new(String::new())
          .append_pair("q", q)
          .append_pair("limit", &limit.to_string())
          .append_pair("offset", &offset.to_string())
          .finish();
        format!("branches?{}", params)
      }
      Self::Detail { ifsc } => {
        let ifsc: String = url::form_urlencoded::byte_serialize(ifsc.as_bytes()).collect();
        format!("branches/{}", ifsc)
      }
    }
  }

  /// Stable, fixed-length storage key.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    hex::encode(hasher.finalize())
  }

  pub fn description(&self) -> String {
    match self {
      Self::List { q, limit, offset } if q.is_empty() => {
        format!("branches [{}..{}]", offset, offset.saturating_add(*limit))
      }
      Self::List { q, limit, offset } => {
        format!("branches '{}' [{}..{}]", q, offset, offset.saturating_add(*limit))
      }
      Self::Detail { ifsc } => format!("branch {}", ifsc),
    }
  }
}
