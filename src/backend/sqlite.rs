//! SQLite-backed table layer.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use super::{Backend, CacheRow};
use crate::Result;

/// How long a write blocks on another process's lock before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Persisted schema. Must stay compatible with existing cache files.
const SCHEMA: &str = r#"
create table if not exists Cache (
    input     text not null,
    info      text not null,
    path      text not null,
    immutable integer not null,
    timestamp integer not null,
    primary key (input)
);

create table if not exists Facts (
    name     text not null,
    value    text not null,
    primary key (name)
);
"#;

const ADD_SQL: &str =
    "insert or replace into Cache(input, info, path, immutable, timestamp) values (?1, ?2, ?3, ?4, ?5)";
const LOOKUP_SQL: &str = "select info, path, immutable, timestamp from Cache where input = ?1";
const UPSERT_FACT_SQL: &str = "insert or replace into Facts(name, value) values (?1, ?2)";
const QUERY_FACT_SQL: &str = "select value from Facts where name = ?1";

/// A single SQLite connection holding the `Cache` and `Facts` tables.
///
/// The four statements are prepared once at open time through the
/// connection's statement cache and reused on every call. Cross-process
/// safety is SQLite's own file locking; a busy database blocks for up to
/// [`DEFAULT_BUSY_TIMEOUT`].
pub struct SqliteBackend {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Open (or create) the cache database at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let backend = Self::init(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "opened fetcher cache");
        Ok(backend)
    }

    /// Open a private in-memory database. Nothing survives the backend.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;

        // The cache can always be rebuilt by fetching again, so trade
        // durability for speed.
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.pragma_update_and_check(None, "journal_mode", "truncate", |row| {
            row.get::<_, String>(0)
        })?;

        conn.execute_batch(SCHEMA)?;

        // Preparing up front surfaces a schema mismatch at open time.
        for sql in [ADD_SQL, LOOKUP_SQL, UPSERT_FACT_SQL, QUERY_FACT_SQL] {
            conn.prepare_cached(sql)?;
        }

        Ok(Self { conn, path })
    }

    /// Location of the database file, or `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Backend for SqliteBackend {
    fn upsert_cache_row(&mut self, row: &CacheRow) -> Result<()> {
        self.conn.prepare_cached(ADD_SQL)?.execute(params![
            row.input,
            row.info,
            row.path,
            row.immutable,
            row.timestamp,
        ])?;
        Ok(())
    }

    fn lookup_cache_row(&mut self, input: &str) -> Result<Option<CacheRow>> {
        let row = self
            .conn
            .prepare_cached(LOOKUP_SQL)?
            .query_row(params![input], |row| {
                Ok(CacheRow {
                    input: input.to_string(),
                    info: row.get(0)?,
                    path: row.get(1)?,
                    immutable: row.get::<_, i64>(2)? != 0,
                    timestamp: row.get(3)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    fn upsert_fact_row(&mut self, name: &str, value: &str) -> Result<()> {
        self.conn
            .prepare_cached(UPSERT_FACT_SQL)?
            .execute(params![name, value])?;
        Ok(())
    }

    fn lookup_fact_row(&mut self, name: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .prepare_cached(QUERY_FACT_SQL)?
            .query_row(params![name], |row| row.get(0))
            .optional()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(input: &str, info: &str, timestamp: i64) -> CacheRow {
        CacheRow {
            input: input.to_string(),
            info: info.to_string(),
            path: String::new(),
            immutable: false,
            timestamp,
        }
    }

    #[test]
    fn missing_row_is_none() {
        let mut db = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(db.lookup_cache_row("{}").unwrap(), None);
        assert_eq!(db.lookup_fact_row("k").unwrap(), None);
    }

    #[test]
    fn upsert_replaces_every_field() {
        let mut db = SqliteBackend::open_in_memory().unwrap();
        db.upsert_cache_row(&row("in", "old", 1)).unwrap();

        let replacement = CacheRow {
            path: "/nix/store/x".to_string(),
            immutable: true,
            ..row("in", "new", 2)
        };
        db.upsert_cache_row(&replacement).unwrap();

        assert_eq!(db.lookup_cache_row("in").unwrap(), Some(replacement));
    }

    #[test]
    fn facts_are_last_write_wins() {
        let mut db = SqliteBackend::open_in_memory().unwrap();
        db.upsert_fact_row("k", "v1").unwrap();
        db.upsert_fact_row("k", "v2").unwrap();
        assert_eq!(db.lookup_fact_row("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn in_memory_has_no_path() {
        let db = SqliteBackend::open_in_memory().unwrap();
        assert!(db.path().is_none());
    }
}
