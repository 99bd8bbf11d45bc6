//! Process-wide cache instance.
//!
//! Library code that can take a `&dyn Cache` should; this accessor is for
//! the outermost layer of a program. Tests should build their own
//! [`FetcherCache`] instead.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::Result;
use crate::backend::SqliteBackend;
use crate::cache::{Cache, FetcherCache};
use crate::settings::Settings;

static CACHE: OnceCell<Arc<FetcherCache<SqliteBackend>>> = OnceCell::new();

/// The shared on-disk cache, opened on first use.
///
/// Settings are loaded from the standard locations (see
/// [`Settings::load`]). If opening fails the error is returned and the next
/// call tries again. The instance lives until the process exits.
pub fn get_cache() -> Result<Arc<dyn Cache>> {
    let cache = CACHE.get_or_try_init(|| {
        let settings = Settings::load(None)?;
        FetcherCache::open(&settings).map(Arc::new)
    })?;
    Ok(Arc::clone(cache) as Arc<dyn Cache>)
}
