//! Branch client with transparent TTL caching.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;

use super::cache::BranchQueryKey;
use super::client::BranchApi;
use super::types::{Branch, BranchPage, ListQuery};
use crate::cache::{CacheResult, TtlCache};
use crate::error::Result;

/// Lifetime of every cached listing page and branch, in milliseconds.
pub const CACHE_TTL_MS: i64 = 600_000;

fn cache_ttl() -> Duration {
  Duration::milliseconds(CACHE_TTL_MS)
}

/// Wraps a [`BranchApi`] and answers repeated requests from the cache.
///
/// Only successful responses are cached, so errors (including not-found)
/// are retried on the next call.
#[derive(Clone)]
pub struct CachedBranchClient {
  inner: Arc<dyn BranchApi>,
  cache: TtlCache,
}

impl CachedBranchClient {
  pub fn new(inner: Arc<dyn BranchApi>, cache: TtlCache) -> Self {
    Self { inner, cache }
  }

  /// Fetch one page of the listing.
  pub async fn list_branches(&self, query: &ListQuery) -> Result<BranchPage> {
    let key = BranchQueryKey::list(query);
    let result = self
      .fetch_cached(&key, || self.inner.fetch_page(query))
      .await?;
    tracing::debug!(
      offset = query.offset,
      items = result.data.items.len(),
      source = ?result.source,
      "page ready"
    );
    Ok(result.data)
  }

  /// Fetch a single branch by IFSC.
  pub async fn get_branch(&self, ifsc: &str) -> Result<Branch> {
    let key = BranchQueryKey::detail(ifsc);
    let result = self
      .fetch_cached(&key, || self.inner.fetch_branch(ifsc))
      .await?;
    tracing::debug!(ifsc, source = ?result.source, "branch ready");
    Ok(result.data)
  }

  /// Serve from cache when possible, otherwise fetch and store.
  async fn fetch_cached<T, F, Fut>(&self, key: &BranchQueryKey, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let hash = key.cache_hash();

    if let Some(data) = self.cache.get_json::<T>(&hash) {
      tracing::debug!(query = %key.description(), "cache hit");
      return Ok(CacheResult::from_cache(data));
    }

    tracing::debug!(query = %key.description(), "cache miss, fetching");
    match fetcher().await {
      Ok(data) => {
        self.cache.set_json(&hash, &data, cache_ttl());
        Ok(CacheResult::from_network(data))
      }
      Err(e) => {
        tracing::warn!(query = %key.description(), error = %e, "fetch failed");
        Err(e)
      }
    }
  }
}
