//! Wire types for the branch API and the decode step that validates them.

use serde::Deserialize;

use super::types::{Branch, BranchPage};
use crate::error::{BranchError, Result};

/// Raw branch as returned by the API.
#[derive(Debug, Deserialize)]
pub struct ApiBranch {
  pub ifsc: String,
  pub bank: String,
  pub branch: String,
  pub address: String,
  pub city: String,
  pub district: String,
  pub state: String,
}

impl ApiBranch {
  pub fn into_branch(self) -> Result<Branch> {
    if self.ifsc.trim().is_empty() {
      return Err(BranchError::Deserialization(
        "branch record has an empty ifsc".to_string(),
      ));
    }

    Ok(Branch {
      ifsc: self.ifsc,
      bank: self.bank,
      branch: self.branch,
      address: self.address,
      city: self.city,
      district: self.district,
      state: self.state,
    })
  }
}

/// Response body of `GET /branches`.
#[derive(Debug, Deserialize)]
pub struct ApiBranchesResponse {
  pub count: u64,
  pub results: Vec<ApiBranch>,
}

impl ApiBranchesResponse {
  pub fn into_page(self, limit: u32) -> Result<BranchPage> {
    if self.results.len() > limit as usize {
      return Err(BranchError::Deserialization(format!(
        "page holds {} records but limit is {}",
        self.results.len(),
        limit
      )));
    }

    let items = self
      .results
      .into_iter()
      .map(ApiBranch::into_branch)
      .collect::<Result<Vec<_>>>()?;

    Ok(BranchPage {
      count: self.count,
      items,
    })
  }
}

/// Decode a listing body.
pub fn decode_page(body: &[u8], limit: u32) -> Result<BranchPage> {
  let response: ApiBranchesResponse = serde_json::from_slice(body)?;
  response.into_page(limit)
}

/// Decode a single-branch body.
pub fn decode_branch(body: &[u8]) -> Result<Branch> {
  let branch: ApiBranch = serde_json::from_slice(body)?;
  branch.into_branch()
}
