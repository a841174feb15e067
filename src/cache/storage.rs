//! Cache storage trait with in-memory, SQLite and no-op backends.

use chrono::{DateTime, SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::CacheEntry;

/// Trait for cache storage backends.
///
/// Backends store entries verbatim. Expiry is decided by the cache layer,
/// so a backend may hand back an entry that is already expired.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `key`, expired or not.
  fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>>;

  /// Store an entry, replacing any prior entry for the same key.
  fn put_entry(&self, entry: CacheEntry) -> Result<()>;

  /// Physically remove an entry.
  fn remove(&self, key: &str) -> Result<()>;

  /// Remove every entry.
  fn clear(&self) -> Result<()>;
}

/// Process-wide in-memory storage.
///
/// The mutex makes each read and write atomic when the cache is shared
/// across tokio worker threads.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.lock().map(|e| e.len()).unwrap_or(0)
  }
}

impl CacheStorage for MemoryStorage {
  fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn put_entry(&self, entry: CacheEntry) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(entry.key.clone(), entry);
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.clear();
    Ok(())
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get_entry(&self, _key: &str) -> Result<Option<CacheEntry>> {
    Ok(None) // Always miss
  }

  fn put_entry(&self, _entry: CacheEntry) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

/// SQLite-backed storage so cached responses survive restarts.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the cache database at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    storage.purge_expired(Utc::now())?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("branches-tui").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }

  /// Physically drop entries that expired before `now`.
  pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let removed = conn
      .execute(
        "DELETE FROM ttl_cache WHERE expires_at <= ?",
        params![format_datetime(now)],
      )
      .map_err(|e| eyre!("Failed to purge expired entries: {}", e))?;

    if removed > 0 {
      tracing::debug!(removed, "purged expired cache entries");
    }
    Ok(removed)
  }
}

const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ttl_cache (
    cache_key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ttl_cache_expires ON ttl_cache(expires_at);
"#;

impl CacheStorage for SqliteStorage {
  fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(String, String)> = conn
      .query_row(
        "SELECT value, expires_at FROM ttl_cache WHERE cache_key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry: {}", e))?;

    match row {
      Some((value, expires_at)) => Ok(Some(CacheEntry {
        key: key.to_string(),
        value,
        expires_at: parse_datetime(&expires_at)?,
      })),
      None => Ok(None),
    }
  }

  fn put_entry(&self, entry: CacheEntry) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO ttl_cache (cache_key, value, expires_at) VALUES (?, ?, ?)",
        params![entry.key, entry.value, format_datetime(entry.expires_at)],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM ttl_cache WHERE cache_key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove cache entry: {}", e))?;

    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM ttl_cache", [])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    Ok(())
  }
}

/// Fixed-width UTC timestamps so `expires_at` compares correctly as text.
fn format_datetime(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;
  use tempfile::TempDir;

  #[test]
  fn test_memory_put_overwrites() {
    let storage = MemoryStorage::new();
    let expires = Utc::now() + Duration::minutes(1);

    storage.put_entry(CacheEntry::new("k", "one", expires)).unwrap();
    storage.put_entry(CacheEntry::new("k", "two", expires)).unwrap();

    let entry = storage.get_entry("k").unwrap().unwrap();
    assert_eq!(entry.value, "two");
    assert_eq!(storage.len(), 1);
  }

  #[test]
  fn test_noop_always_misses() {
    let storage = NoopStorage;
    storage
      .put_entry(CacheEntry::new("k", "v", Utc::now() + Duration::minutes(1)))
      .unwrap();
    assert!(storage.get_entry("k").unwrap().is_none());
  }

  #[test]
  fn test_sqlite_roundtrip_and_clear() {
    let temp_dir = TempDir::new().unwrap();
    let storage = SqliteStorage::open_at(&temp_dir.path().join("cache.db")).unwrap();
    let expires = Utc::now() + Duration::minutes(10);

    storage
      .put_entry(CacheEntry::new("branches/ABC0001", "{}", expires))
      .unwrap();
    let entry = storage.get_entry("branches/ABC0001").unwrap().unwrap();
    assert_eq!(entry.value, "{}");
    assert_eq!(entry.expires_at.timestamp(), expires.timestamp());

    storage.clear().unwrap();
    assert!(storage.get_entry("branches/ABC0001").unwrap().is_none());
  }

  #[test]
  fn test_sqlite_survives_reopen_and_purges_expired() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.db");

    {
      let storage = SqliteStorage::open_at(&path).unwrap();
      storage
        .put_entry(CacheEntry::new("fresh", "1", Utc::now() + Duration::minutes(10)))
        .unwrap();
      storage
        .put_entry(CacheEntry::new("stale", "2", Utc::now() - Duration::minutes(1)))
        .unwrap();
    }

    let storage = SqliteStorage::open_at(&path).unwrap();
    assert!(storage.get_entry("fresh").unwrap().is_some());
    assert!(storage.get_entry("stale").unwrap().is_none());
  }
}
