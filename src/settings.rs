//! Settings loading.
//!
//! Settings are loaded from a TOML file with the following resolution order:
//! 1. An explicit path (must exist)
//! 2. `$XDG_CONFIG_HOME/fetcher-cache/config.toml` (user)
//! 3. `/etc/fetcher-cache/config.toml` (system)
//!
//! If none of these exist the built-in defaults apply.
//!
//! ```toml
//! [cache]
//! ttl_secs = 3600
//! path = "/var/cache/fetcher-cache/fetcher-cache-v2.sqlite"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{CacheError, Result};

/// Directory name used under the user's config and cache directories.
pub const APP_DIR: &str = "fetcher-cache";

/// File name of the cache database. The `v2` suffix tracks the schema.
pub const DB_FILE_NAME: &str = "fetcher-cache-v2.sqlite";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Settings for the fetcher cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Seconds after which a mutable entry is stale (default: 3600).
    /// `0` makes every mutable entry stale immediately.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Database location (default: under the user's cache directory).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            path: None,
        }
    }
}

fn default_ttl_secs() -> u64 {
    60 * 60
}

impl Settings {
    /// Load settings from the standard locations, falling back to defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse settings from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CacheError::Configuration(format!("Failed to read settings file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CacheError::Configuration(format!("Failed to parse settings file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(CacheError::Configuration(format!(
                "Settings file not found: {path:?}"
            )));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(APP_DIR).join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Database location: the configured path, or the default one.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.cache.path {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }
}

/// Default database location: `~/.cache/fetcher-cache/fetcher-cache-v2.sqlite`.
pub fn default_db_path() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(APP_DIR).join(DB_FILE_NAME))
        .ok_or_else(|| {
            CacheError::Configuration("cannot determine the user's cache directory".to_string())
        })
}
