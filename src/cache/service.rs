//! [`FetcherCache`]: expiry policy over a guarded [`Backend`].

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, instrument};

use super::state::Guarded;
use super::{Cache, Clock, Lookup, PathLookup, SystemClock, is_expired};
use crate::attrs::{self, Attrs};
use crate::backend::{Backend, CacheRow, MemoryBackend, SqliteBackend};
use crate::settings::{CacheSettings, Settings};
use crate::store::{Store, StorePath};
use crate::{Result, telemetry};

/// The cache implementation, generic over its table layer.
///
/// Production code uses `FetcherCache<SqliteBackend>` (see
/// [`FetcherCache::open`]); tests can use [`FetcherCache::in_memory`].
///
/// ```rust
/// # use fetcher_cache::{Attrs, Cache, FetcherCache};
/// let cache = FetcherCache::in_memory();
///
/// let mut input = Attrs::new();
/// input.insert("url".into(), "https://example.org/x.tar.gz".into());
/// let mut info = Attrs::new();
/// info.insert("etag".into(), "\"abc\"".into());
///
/// cache.add(&input, &info)?;
/// assert_eq!(cache.lookup2(&input)?, Some(info));
/// # Ok::<(), fetcher_cache::CacheError>(())
/// ```
pub struct FetcherCache<B> {
    state: Guarded<B>,
    ttl_secs: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl<B: Backend> FetcherCache<B> {
    /// Wrap `backend` with the default TTL and the system clock.
    pub fn new(backend: B) -> Self {
        Self {
            state: Guarded::new(backend),
            ttl_secs: AtomicU64::new(CacheSettings::default().ttl_secs),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the TTL in seconds. `0` expires every mutable entry.
    pub fn with_ttl_secs(self, ttl_secs: u64) -> Self {
        self.set_ttl_secs(ttl_secs);
        self
    }

    /// Use `clock` for timestamps and expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current TTL in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs.load(Ordering::Relaxed)
    }

    /// Change the TTL. Applies to all subsequent lookups, including of
    /// rows written earlier.
    pub fn set_ttl_secs(&self, ttl_secs: u64) {
        self.ttl_secs.store(ttl_secs, Ordering::Relaxed);
    }

    fn expired(&self, row: &CacheRow) -> bool {
        is_expired(row.immutable, row.timestamp, self.clock.now(), self.ttl_secs())
    }

    fn write(&self, row: CacheRow, kind: &'static str) -> Result<()> {
        self.state.lock().upsert_cache_row(&row)?;
        metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "kind" => kind).increment(1);
        Ok(())
    }
}

impl FetcherCache<SqliteBackend> {
    /// Open the on-disk cache described by `settings`.
    pub fn open(settings: &Settings) -> Result<Self> {
        let path = settings.db_path()?;
        Ok(Self::open_at(&path)?.with_ttl_secs(settings.cache.ttl_secs))
    }

    /// Open the on-disk cache at `path` with the default TTL.
    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(SqliteBackend::open(path)?))
    }
}

impl FetcherCache<MemoryBackend> {
    /// A non-persistent cache with the default TTL.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: Backend> Cache for FetcherCache<B> {
    fn add(&self, in_attrs: &Attrs, info_attrs: &Attrs) -> Result<()> {
        let row = CacheRow {
            input: attrs::encode(in_attrs)?,
            info: attrs::encode(info_attrs)?,
            path: String::new(),
            immutable: false,
            timestamp: self.clock.now(),
        };
        self.write(row, telemetry::KIND_ATTRS)
    }

    #[instrument(level = "trace", skip_all)]
    fn lookup_expired2(&self, in_attrs: &Attrs) -> Result<Option<Lookup>> {
        let input = attrs::encode(in_attrs)?;
        let mut state = self.state.lock();

        let Some(row) = state.lookup_cache_row(&input)? else {
            debug!(%input, "did not find cache entry");
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "kind" => telemetry::KIND_ATTRS)
                .increment(1);
            return Ok(None);
        };

        let expired = self.expired(&row);
        let info_attrs = attrs::decode(&row.info)?;
        debug!(%input, info = %row.info, "using cache entry");
        record_lookup(expired, telemetry::KIND_ATTRS);

        Ok(Some(Lookup {
            expired,
            info_attrs,
        }))
    }

    fn add_path(
        &self,
        store: &dyn Store,
        in_attrs: &Attrs,
        info_attrs: &Attrs,
        store_path: &StorePath,
        locked: bool,
    ) -> Result<()> {
        let row = CacheRow {
            input: attrs::encode(in_attrs)?,
            info: attrs::encode(info_attrs)?,
            path: store.print_path(store_path),
            immutable: locked,
            timestamp: self.clock.now(),
        };
        self.write(row, telemetry::KIND_PATH)
    }

    #[instrument(level = "trace", skip_all)]
    fn lookup_expired(&self, store: &dyn Store, in_attrs: &Attrs) -> Result<Option<PathLookup>> {
        let input = attrs::encode(in_attrs)?;
        let mut state = self.state.lock();

        let Some(row) = state.lookup_cache_row(&input)? else {
            debug!(%input, "did not find cache entry");
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "kind" => telemetry::KIND_PATH)
                .increment(1);
            return Ok(None);
        };

        let store_path = store.parse_path(&row.path)?;

        // Root first: checking validity before the root exists would let the
        // collector delete the path between the check and the registration.
        store.add_temp_root(&store_path)?;
        if !store.is_valid_path(&store_path)? {
            debug!(%input, "ignoring disappeared cache entry");
            metrics::counter!(telemetry::CACHE_DISAPPEARED_TOTAL).increment(1);
            return Ok(None);
        }

        let expired = self.expired(&row);
        let info_attrs = attrs::decode(&row.info)?;
        debug!(%input, info = %row.info, path = %row.path, "using cache entry");
        record_lookup(expired, telemetry::KIND_PATH);

        Ok(Some(PathLookup {
            expired,
            info_attrs,
            store_path,
        }))
    }

    fn upsert_fact(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, value, "upserting fact");
        self.state.lock().upsert_fact_row(key, value)?;
        metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "kind" => telemetry::KIND_FACT)
            .increment(1);
        Ok(())
    }

    fn query_fact(&self, key: &str) -> Result<Option<String>> {
        let value = self.state.lock().lookup_fact_row(key)?;
        let metric = if value.is_some() {
            telemetry::CACHE_HITS_TOTAL
        } else {
            telemetry::CACHE_MISSES_TOTAL
        };
        metrics::counter!(metric, "kind" => telemetry::KIND_FACT).increment(1);
        Ok(value)
    }
}

fn record_lookup(expired: bool, kind: &'static str) {
    let metric = if expired {
        telemetry::CACHE_EXPIRED_TOTAL
    } else {
        telemetry::CACHE_HITS_TOTAL
    };
    metrics::counter!(metric, "kind" => kind).increment(1);
}
