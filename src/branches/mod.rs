//! Branch lookup service: wire types, HTTP client, caching and filtering.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod filter;
pub mod types;

pub use cached_client::CachedBranchClient;
pub use client::BranchClient;
pub use filter::BranchFilter;
pub use types::{Branch, BranchPage, ListQuery};
