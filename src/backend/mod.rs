//! Persistent table layer.
//!
//! Two tables back the cache:
//!
//! ```sql
//! Cache(input PK, info, path, immutable, timestamp)
//! Facts(name PK, value)
//! ```
//!
//! A [`Backend`] offers whole-row upsert and point lookup on both. It knows
//! nothing about expiry, attribute encoding or store paths; that policy lives
//! in [`FetcherCache`](crate::cache::FetcherCache), which also serializes
//! access so backends take `&mut self`.
//!
//! - [`SqliteBackend`] — the durable on-disk implementation.
//! - [`MemoryBackend`] — a `HashMap`-backed implementation for tests.

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::{DEFAULT_BUSY_TIMEOUT, SqliteBackend};

use crate::Result;

/// One row of the `Cache` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    /// Canonical encoding of the input attributes. Primary key.
    pub input: String,
    /// Canonical encoding of the info attributes.
    pub info: String,
    /// Printed store path, or an empty string for path-less entries.
    pub path: String,
    /// Entries whose input is pinned never expire.
    pub immutable: bool,
    /// Seconds since the Unix epoch at which the row was written.
    pub timestamp: i64,
}

/// Row-level storage for the `Cache` and `Facts` tables.
pub trait Backend: Send {
    /// Insert a cache row, replacing every field of any row with the same `input`.
    fn upsert_cache_row(&mut self, row: &CacheRow) -> Result<()>;

    /// Fetch the cache row for `input`, if any.
    fn lookup_cache_row(&mut self, input: &str) -> Result<Option<CacheRow>>;

    /// Insert a fact, replacing any existing value for `name`.
    fn upsert_fact_row(&mut self, name: &str, value: &str) -> Result<()>;

    /// Fetch the fact stored under `name`, if any.
    fn lookup_fact_row(&mut self, name: &str) -> Result<Option<String>>;
}
