//! Fetcher cache error types

/// Fetcher cache error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    // Storage errors
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed JSON that is not a flat object of supported attribute values.
    #[error("invalid attribute set: {0}")]
    InvalidAttrs(String),

    #[error("input attribute '{0}' is missing")]
    MissingAttr(String),

    #[error("input attribute '{name}' is not {expected}")]
    AttrType {
        name: String,
        expected: &'static str,
    },

    // Storage subsystem errors
    /// A stored path string could not be parsed. This indicates a corrupt
    /// cache row, not a path that has since been garbage-collected.
    #[error("invalid store path: {0}")]
    InvalidPath(String),

    #[error("store error: {0}")]
    Store(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Whether this error signals on-disk corruption of a cache row
    /// (undecodable `info` or unparseable `path`).
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            CacheError::Json(_) | CacheError::InvalidAttrs(_) | CacheError::InvalidPath(_)
        )
    }
}

/// Result type alias for fetcher cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
