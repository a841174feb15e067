//! Error types for branch lookups.
//!
//! Transport, missing-entity and payload-shape failures are kept distinct so
//! views can tell "not found" apart from "something broke".

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BranchError {
  /// Connection failure or a non-2xx response.
  #[error("network error: {0}")]
  Network(String),

  /// The request was valid but no branch has this IFSC.
  #[error("branch not found: {0}")]
  NotFound(String),

  /// A cached or remote payload did not have the expected shape.
  #[error("malformed payload: {0}")]
  Deserialization(String),
}

impl BranchError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, BranchError::NotFound(_))
  }
}

impl From<reqwest::Error> for BranchError {
  fn from(err: reqwest::Error) -> Self {
    BranchError::Network(err.to_string())
  }
}

impl From<serde_json::Error> for BranchError {
  fn from(err: serde_json::Error) -> Self {
    BranchError::Deserialization(err.to_string())
  }
}

pub type Result<T> = std::result::Result<T, BranchError>;
