//! fetcher-cache - persistent cache for fetcher results
//!
//! Fetchers that download sources or query remote metadata record what they
//! were asked for (the *input* attributes) and what they found (the *info*
//! attributes, and optionally a store path holding the artifact). Later
//! requests for the same input reuse the result until it goes stale.
//!
//! # Example
//!
//! ```rust,no_run
//! use fetcher_cache::{Attrs, Cache};
//!
//! fn main() -> fetcher_cache::Result<()> {
//!     let cache = fetcher_cache::get_cache()?;
//!
//!     let mut input = Attrs::new();
//!     input.insert("type".into(), "git".into());
//!     input.insert("url".into(), "https://example.org/repo.git".into());
//!
//!     match cache.lookup2(&input)? {
//!         Some(info) => println!("cached: {info:?}"),
//!         None => {
//!             let mut info = Attrs::new();
//!             info.insert("rev".into(), "0123abcd".into());
//!             cache.add(&input, &info)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The cache database lives at `~/.cache/fetcher-cache/fetcher-cache-v2.sqlite`
//! by default and is safe to share between processes.

pub mod attrs;
pub mod backend;
pub mod cache;
pub mod error;
pub mod global;
pub mod settings;
pub mod store;
pub mod telemetry;
pub mod version;

// Re-export main types at crate root
pub use attrs::{Attr, Attrs};
pub use backend::{Backend, CacheRow, MemoryBackend, SqliteBackend};
pub use cache::{Cache, Clock, FetcherCache, Lookup, ManualClock, PathLookup, SystemClock};
pub use error::{CacheError, Result};
pub use global::get_cache;
pub use settings::Settings;
pub use store::{MemoryStore, Store, StorePath};
pub use version::{PKG_VERSION, version_string};
