//! Cache service.
//!
//! [`Cache`] is the capability surface consumed by fetchers. It has two
//! families of entries that share one table:
//!
//! - **Path-less** entries map input attributes to info attributes.
//!   [`Cache::add`], [`Cache::lookup2`], [`Cache::lookup_expired2`].
//! - **Path** entries additionally name a store path holding the fetched
//!   artifact. [`Cache::add_path`], [`Cache::lookup`], [`Cache::lookup_expired`].
//!
//! Plus a small [`Cache::upsert_fact`] / [`Cache::query_fact`] key-value
//! store for values that never go stale.
//!
//! # Expiry
//!
//! A row is *expired* when it is mutable and either the TTL is `0` or
//! `timestamp + ttl < now`. Expired rows are never deleted: the plain
//! lookups hide them, the `*_expired` variants return them flagged. See
//! [`is_expired`].
//!
//! # Concurrency
//!
//! Each call is atomic with respect to other calls in the process. A
//! lookup-fetch-add sequence is not: two callers can both miss and both
//! add, in which case the last add wins.

mod clock;
mod service;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use service::FetcherCache;

use tracing::debug;

use crate::Result;
use crate::attrs::{self, Attrs};
use crate::store::{Store, StorePath};

/// Result of [`Cache::lookup_expired2`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub expired: bool,
    pub info_attrs: Attrs,
}

/// Result of [`Cache::lookup_expired`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLookup {
    pub expired: bool,
    pub info_attrs: Attrs,
    pub store_path: StorePath,
}

/// Whether a row written at `timestamp` is stale at `now`.
///
/// Immutable rows are never stale. A TTL of `0` makes every mutable row
/// stale regardless of its age.
pub fn is_expired(immutable: bool, timestamp: i64, now: i64, ttl_secs: u64) -> bool {
    if immutable {
        return false;
    }
    let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    ttl == 0 || timestamp.saturating_add(ttl) < now
}

/// A persistent cache for fetcher results.
pub trait Cache: Send + Sync {
    /// Record a path-less entry. Replaces any entry with the same input.
    fn add(&self, in_attrs: &Attrs, info_attrs: &Attrs) -> Result<()>;

    /// Look up a path-less entry, hiding it if expired.
    fn lookup2(&self, in_attrs: &Attrs) -> Result<Option<Attrs>> {
        match self.lookup_expired2(in_attrs)? {
            Some(res) if !res.expired => Ok(Some(res.info_attrs)),
            Some(_) => {
                let input = attrs::encode(in_attrs)?;
                debug!(%input, "ignoring expired cache entry");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Look up a path-less entry, including expired ones. `None` means the
    /// input was never cached.
    fn lookup_expired2(&self, in_attrs: &Attrs) -> Result<Option<Lookup>>;

    /// Record an entry whose artifact lives at `store_path`. `locked`
    /// marks the entry immutable.
    fn add_path(
        &self,
        store: &dyn Store,
        in_attrs: &Attrs,
        info_attrs: &Attrs,
        store_path: &StorePath,
        locked: bool,
    ) -> Result<()>;

    /// Look up a path entry, hiding it if expired or if its path is gone.
    fn lookup(&self, store: &dyn Store, in_attrs: &Attrs) -> Result<Option<(Attrs, StorePath)>> {
        match self.lookup_expired(store, in_attrs)? {
            Some(res) if !res.expired => Ok(Some((res.info_attrs, res.store_path))),
            Some(_) => {
                let input = attrs::encode(in_attrs)?;
                debug!(%input, "ignoring expired cache entry");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Look up a path entry, including expired ones.
    ///
    /// The stored path is registered as a temp root before its validity is
    /// checked. A path that is no longer valid yields `None`; a stored path
    /// that cannot be parsed is an error.
    fn lookup_expired(&self, store: &dyn Store, in_attrs: &Attrs) -> Result<Option<PathLookup>>;

    /// Set `key` to `value`, replacing any previous value.
    fn upsert_fact(&self, key: &str, value: &str) -> Result<()>;

    /// Fetch the value recorded for `key`.
    fn query_fact(&self, key: &str) -> Result<Option<String>>;
}
