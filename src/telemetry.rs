//! Telemetry metric name constants.
//!
//! Centralised metric names for cache operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `fetcher_cache_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `kind` — which table family was touched: "attrs" (path-less entries),
//!   "path" (store-path entries) or "fact"

/// Lookups that found a fresh entry.
///
/// Labels: `kind`.
pub const CACHE_HITS_TOTAL: &str = "fetcher_cache_hits_total";

/// Lookups that found no row at all.
///
/// Labels: `kind`.
pub const CACHE_MISSES_TOTAL: &str = "fetcher_cache_misses_total";

/// Lookups that found a row that is past its TTL.
///
/// Labels: `kind`.
pub const CACHE_EXPIRED_TOTAL: &str = "fetcher_cache_expired_total";

/// Path lookups whose store path is no longer valid.
pub const CACHE_DISAPPEARED_TOTAL: &str = "fetcher_cache_disappeared_total";

/// Rows written (cache entries and facts).
///
/// Labels: `kind`.
pub const CACHE_WRITES_TOTAL: &str = "fetcher_cache_writes_total";

pub(crate) const KIND_ATTRS: &str = "attrs";
pub(crate) const KIND_PATH: &str = "path";
pub(crate) const KIND_FACT: &str = "fact";
