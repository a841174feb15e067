//! TTL caching for branch lookups.
//!
//! - Entries carry an absolute expiry and are served only before it
//! - Storage is pluggable: in-memory, SQLite, or disabled
//! - The clock is injectable so expiry can be tested without sleeping

mod layer;
mod storage;
mod traits;

pub use layer::TtlCache;
pub use storage::{MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::CacheResult;

#[cfg(test)]
pub use traits::ManualClock;
