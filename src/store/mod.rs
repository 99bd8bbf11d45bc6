//! Storage subsystem contract.
//!
//! Path-bearing cache rows refer to artifacts in a content-addressed store
//! that owns its own garbage collector. The cache only needs four things from
//! it: render a path, parse a path, protect a path with a temporary root, and
//! ask whether a path is still valid. Those are captured by [`Store`].
//!
//! [`MemoryStore`] is an in-process implementation for tests and tooling.

mod memory;

pub use memory::{MemoryStore, StoreEvent};

use std::fmt;

use crate::{CacheError, Result};

/// Length of the hash part of a store path base name.
pub const HASH_LEN: usize = 32;

/// Maximum length of the name part of a store path base name.
pub const MAX_NAME_LEN: usize = 211;

/// Alphabet of the hash part (base-32 without `e`, `o`, `u`, `t`).
const HASH_CHARS: &[u8] = b"0123456789abcdfghijklmnpqrsvwxyz";

/// A store path, held as its base name `<hash>-<name>`.
///
/// Construction validates the base name; an existing `StorePath` is always
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    base_name: String,
}

impl StorePath {
    /// Parse and validate a base name such as
    /// `ffffffffffffffffffffffffffffffff-source`.
    pub fn new(base_name: impl Into<String>) -> Result<Self> {
        let base_name = base_name.into();
        validate_base_name(&base_name)?;
        Ok(Self { base_name })
    }

    /// The full `<hash>-<name>` base name.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// The hash part.
    pub fn hash_part(&self) -> &str {
        &self.base_name[..HASH_LEN]
    }

    /// The name part.
    pub fn name(&self) -> &str {
        &self.base_name[HASH_LEN + 1..]
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_name)
    }
}

fn validate_base_name(base_name: &str) -> Result<()> {
    let invalid = |reason: &str| CacheError::InvalidPath(format!("'{base_name}' {reason}"));

    let bytes = base_name.as_bytes();
    if bytes.len() < HASH_LEN + 2 {
        return Err(invalid("is too short to be a valid store path"));
    }
    if bytes[HASH_LEN] != b'-' {
        return Err(invalid("lacks a '-' after the hash part"));
    }
    if !bytes[..HASH_LEN].iter().all(|c| HASH_CHARS.contains(c)) {
        return Err(invalid("has an invalid hash part"));
    }

    let name = &base_name[HASH_LEN + 1..];
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("has a name longer than 211 characters"));
    }
    if name.starts_with('.') {
        return Err(invalid("has a name starting with '.'"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || "+-._?=".contains(*c)))
    {
        return Err(invalid(&format!("has an illegal character '{c}' in its name")));
    }
    Ok(())
}

/// The operations the cache consumes from the storage subsystem.
///
/// Implementations must be usable from several threads; the cache calls
/// into the store while holding its own lock, so these methods must not
/// re-enter the cache.
pub trait Store: Send + Sync {
    /// Absolute directory containing all store paths, without a trailing slash.
    fn store_dir(&self) -> &str;

    /// Render a path as an absolute string.
    fn print_path(&self, path: &StorePath) -> String {
        format!("{}/{}", self.store_dir(), path.base_name())
    }

    /// Parse an absolute path previously produced by [`Store::print_path`].
    ///
    /// Fails with [`CacheError::InvalidPath`] on malformed input.
    fn parse_path(&self, s: &str) -> Result<StorePath> {
        let base_name = s
            .strip_prefix(self.store_dir())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.contains('/'))
            .ok_or_else(|| {
                CacheError::InvalidPath(format!(
                    "path '{s}' is not in the store directory '{}'",
                    self.store_dir()
                ))
            })?;
        StorePath::new(base_name)
    }

    /// Register `path` as a temporary GC root for the lifetime of this process.
    fn add_temp_root(&self, path: &StorePath) -> Result<()>;

    /// Whether `path` currently exists in the store.
    fn is_valid_path(&self, path: &StorePath) -> Result<bool>;
}
