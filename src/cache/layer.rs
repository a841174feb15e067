//! TTL cache that sits between the branch client and a storage backend.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use super::storage::CacheStorage;
use super::traits::{CacheEntry, Clock, SystemClock};
use crate::error::BranchError;

/// Key → value cache with per-entry expiry.
///
/// Constructed once at startup and handed to whoever needs it. Cloning is
/// cheap and every clone shares the same storage.
#[derive(Clone)]
pub struct TtlCache {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
}

impl TtlCache {
  /// Create a cache over the given storage using the wall clock.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
    }
  }

  /// Replace the clock used for expiry checks.
  #[cfg(test)]
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Get the value for `key` if present and not expired.
  ///
  /// Missing, expired and unreadable entries all look the same to the caller.
  pub fn get(&self, key: &str) -> Option<String> {
    let entry = match self.storage.get_entry(key) {
      Ok(Some(entry)) => entry,
      Ok(None) => return None,
      Err(e) => {
        tracing::warn!(key, error = %e, "cache read failed, treating as miss");
        return None;
      }
    };

    if entry.is_valid_at(self.clock.now()) {
      Some(entry.value)
    } else {
      tracing::trace!(key, "cache entry expired");
      None
    }
  }

  /// Store `value` under `key` for `ttl`, overwriting any prior entry.
  pub fn set(&self, key: &str, value: impl Into<String>, ttl: Duration) {
    if ttl <= Duration::zero() {
      tracing::warn!(key, "refusing to cache with non-positive ttl");
      return;
    }

    let entry = CacheEntry::new(key, value, self.clock.now() + ttl);
    if let Err(e) = self.storage.put_entry(entry) {
      tracing::warn!(key, error = %e, "cache write failed");
    }
  }

  /// Typed read. A payload that no longer decodes is dropped and reported
  /// as a miss.
  pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = self.get(key)?;
    match decode::<T>(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        tracing::warn!(key, error = %e, "discarding malformed cache entry");
        if let Err(e) = self.storage.remove(key) {
          tracing::warn!(key, error = %e, "failed to remove malformed cache entry");
        }
        None
      }
    }
  }

  /// Typed write.
  pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
    match serde_json::to_string(value) {
      Ok(raw) => self.set(key, raw, ttl),
      Err(e) => tracing::warn!(key, error = %e, "failed to serialize cache entry"),
    }
  }

  /// Drop every entry.
  pub fn clear(&self) -> color_eyre::Result<()> {
    self.storage.clear()
  }
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, BranchError> {
  Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::{MemoryStorage, NoopStorage};
  use crate::cache::traits::ManualClock;
  use serde::Deserialize;

  fn cache_with_clock() -> (TtlCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = TtlCache::new(MemoryStorage::new()).with_clock(clock.clone());
    (cache, clock)
  }

  #[test]
  fn test_get_before_and_after_expiry() {
    let (cache, clock) = cache_with_clock();
    cache.set("k", "v", Duration::milliseconds(600_000));

    assert_eq!(cache.get("k"), Some("v".to_string()));

    clock.advance(Duration::milliseconds(599_999));
    assert_eq!(cache.get("k"), Some("v".to_string()));

    clock.advance(Duration::milliseconds(1));
    assert_eq!(cache.get("k"), None);
  }

  #[test]
  fn test_missing_and_expired_look_the_same() {
    let (cache, clock) = cache_with_clock();
    cache.set("old", "v", Duration::seconds(1));
    clock.advance(Duration::seconds(5));

    assert_eq!(cache.get("old"), cache.get("never-set"));
  }

  #[test]
  fn test_set_overwrites_and_extends_expiry() {
    let (cache, clock) = cache_with_clock();
    cache.set("k", "first", Duration::seconds(10));
    clock.advance(Duration::seconds(8));
    cache.set("k", "second", Duration::seconds(10));
    clock.advance(Duration::seconds(8));

    assert_eq!(cache.get("k"), Some("second".to_string()));
  }

  #[test]
  fn test_zero_ttl_is_not_stored() {
    let (cache, _clock) = cache_with_clock();
    cache.set("k", "v", Duration::zero());
    assert_eq!(cache.get("k"), None);
  }

  #[derive(Debug, Serialize, Deserialize, PartialEq)]
  struct Payload {
    count: u64,
  }

  #[test]
  fn test_json_roundtrip() {
    let (cache, _clock) = cache_with_clock();
    cache.set_json("p", &Payload { count: 2 }, Duration::minutes(1));
    assert_eq!(cache.get_json::<Payload>("p"), Some(Payload { count: 2 }));
  }

  #[test]
  fn test_malformed_payload_is_a_miss() {
    let (cache, _clock) = cache_with_clock();
    cache.set("p", "{not json", Duration::minutes(1));

    assert_eq!(cache.get_json::<Payload>("p"), None);
    // The bad entry is gone, so a plain read misses too.
    assert_eq!(cache.get("p"), None);
  }

  #[test]
  fn test_clear_empties_cache() {
    let (cache, _clock) = cache_with_clock();
    cache.set("a", "1", Duration::minutes(1));
    cache.set("b", "2", Duration::minutes(1));
    cache.clear().unwrap();

    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), None);
  }

  #[test]
  fn test_noop_storage_never_hits() {
    let cache = TtlCache::new(NoopStorage);
    cache.set("k", "v", Duration::minutes(1));
    assert_eq!(cache.get("k"), None);
  }
}
