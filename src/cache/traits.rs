//! Core types for the TTL cache: entries, clocks and lookup results.

use chrono::{DateTime, Utc};
#[cfg(test)]
use chrono::Duration;

/// A stored payload with an absolute expiry.
///
/// An entry is readable only while `now < expires_at`. Expired entries are
/// treated as absent even if a backend has not physically removed them yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
  pub key: String,
  /// Serialized JSON payload
  pub value: String,
  pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
  pub fn new(key: impl Into<String>, value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
      expires_at,
    }
  }

  /// Check whether this entry may be served at `now`.
  pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
    now < self.expires_at
  }
}

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
  now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
  pub fn new() -> Self {
    Self {
      now: std::sync::Mutex::new(Utc::now()),
    }
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap();
    *now += by;
  }
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}

/// Result from a cached fetch, including where the data came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Unexpired data from cache
  Cache,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_entry_valid_strictly_before_expiry() {
    let now = Utc::now();
    let entry = CacheEntry::new("k", "v", now + Duration::seconds(1));

    assert!(entry.is_valid_at(now));
    assert!(!entry.is_valid_at(now + Duration::seconds(1)));
    assert!(!entry.is_valid_at(now + Duration::seconds(2)));
  }

  #[test]
  fn test_manual_clock_advances() {
    let clock = ManualClock::new();
    let start = clock.now();
    clock.advance(Duration::minutes(11));
    assert_eq!(clock.now() - start, Duration::minutes(11));
  }
}
