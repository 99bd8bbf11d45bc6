//! Tests for the on-disk cache: persistence, schema and corrupt rows.

use std::path::Path;
use std::sync::Arc;

use fetcher_cache::{
    Attr, Attrs, Cache, CacheError, FetcherCache, ManualClock, MemoryStore, Settings,
    SqliteBackend, StorePath,
};
use rusqlite::{Connection, params};

const T0: i64 = 1_700_000_000;

fn attrs(pairs: &[(&str, &str)]) -> Attrs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Attr::from(*v)))
        .collect()
}

fn open(path: &Path, clock: &Arc<ManualClock>) -> FetcherCache<SqliteBackend> {
    FetcherCache::open_at(path)
        .unwrap()
        .with_ttl_secs(3600)
        .with_clock(clock.clone())
}

fn insert_raw(path: &Path, input: &str, info: &str, store_path: &str, immutable: bool) {
    let conn = Connection::open(path).unwrap();
    conn.execute(
        "insert or replace into Cache(input, info, path, immutable, timestamp) values (?1, ?2, ?3, ?4, ?5)",
        params![input, info, store_path, immutable, T0],
    )
    .unwrap();
}

#[test]
fn creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a").join("b").join("cache.sqlite");

    let _cache = FetcherCache::open_at(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    let clock = Arc::new(ManualClock::new(T0));
    let input = attrs(&[("url", "https://x")]);
    let info = attrs(&[("rev", "abc")]);

    {
        let cache = open(&path, &clock);
        cache.add(&input, &info).unwrap();
        cache.upsert_fact("k", "v").unwrap();
    }

    let cache = open(&path, &clock);
    assert_eq!(cache.lookup2(&input).unwrap(), Some(info));
    assert_eq!(cache.query_fact("k").unwrap().as_deref(), Some("v"));
}

#[test]
fn two_instances_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    let clock = Arc::new(ManualClock::new(T0));

    let writer = open(&path, &clock);
    let reader = open(&path, &clock);

    writer.upsert_fact("k", "v1").unwrap();
    assert_eq!(reader.query_fact("k").unwrap().as_deref(), Some("v1"));
    reader.upsert_fact("k", "v2").unwrap();
    assert_eq!(writer.query_fact("k").unwrap().as_deref(), Some("v2"));
}

#[test]
fn stored_row_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    let clock = Arc::new(ManualClock::new(T0));
    let store = MemoryStore::new();
    let store_path = StorePath::new("0c5vwbz8pbj2hzxn0qlns6mcyy0q0qfa-source").unwrap();

    let cache = open(&path, &clock);
    cache
        .add_path(
            &store,
            &attrs(&[("url", "https://x"), ("type", "tarball")]),
            &attrs(&[("etag", "e")]),
            &store_path,
            true,
        )
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    let (input, info, stored_path, immutable, timestamp): (String, String, String, i64, i64) =
        conn.query_row(
            "select input, info, path, immutable, timestamp from Cache",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .unwrap();

    assert_eq!(input, r#"{"type":"tarball","url":"https://x"}"#);
    assert_eq!(info, r#"{"etag":"e"}"#);
    assert_eq!(
        stored_path,
        "/nix/store/0c5vwbz8pbj2hzxn0qlns6mcyy0q0qfa-source"
    );
    assert_eq!(immutable, 1);
    assert_eq!(timestamp, T0);
}

#[test]
fn pathless_rows_store_empty_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    let clock = Arc::new(ManualClock::new(T0));
    open(&path, &clock)
        .add(&attrs(&[("url", "u")]), &attrs(&[]))
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    let (stored_path, immutable): (String, i64) = conn
        .query_row("select path, immutable from Cache", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(stored_path, "");
    assert_eq!(immutable, 0);
}

#[test]
fn reading_existing_file_from_older_writer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    let clock = Arc::new(ManualClock::new(T0 + 10));
    let cache = open(&path, &clock);

    insert_raw(&path, r#"{"url":"https://x"}"#, r#"{"rev":"abc"}"#, "", false);

    assert_eq!(
        cache.lookup2(&attrs(&[("url", "https://x")])).unwrap(),
        Some(attrs(&[("rev", "abc")]))
    );
}

#[test]
fn corrupt_info_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    let clock = Arc::new(ManualClock::new(T0));
    let cache = open(&path, &clock);

    insert_raw(&path, r#"{"url":"https://x"}"#, "{truncated", "", false);

    let err = cache
        .lookup_expired2(&attrs(&[("url", "https://x")]))
        .unwrap_err();
    assert!(matches!(err, CacheError::Json(_)));
    assert!(err.is_corruption());
}

#[test]
fn malformed_path_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    let clock = Arc::new(ManualClock::new(T0));
    let cache = open(&path, &clock);
    let store = MemoryStore::new();

    insert_raw(&path, r#"{"url":"u"}"#, "{}", "/nix/store/not-a-hash", false);

    let err = cache.lookup(&store, &attrs(&[("url", "u")])).unwrap_err();
    assert!(matches!(err, CacheError::InvalidPath(_)));
    assert!(store.temp_roots().is_empty());
}

#[test]
fn schema_creation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");

    for _ in 0..3 {
        FetcherCache::open_at(&path).unwrap();
    }

    let conn = Connection::open(&path).unwrap();
    let tables: i64 = conn
        .query_row(
            "select count(*) from sqlite_master where type = 'table' and name in ('Cache', 'Facts')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 2);
}

#[test]
fn incompatible_schema_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.sqlite");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("create table Cache (input text primary key, other text)")
            .unwrap();
    }

    let err = FetcherCache::open_at(&path).err().unwrap();
    assert!(matches!(err, CacheError::Sqlite(_)));
}

#[test]
fn open_from_settings() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("nested").join("cache.sqlite");
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!("[cache]\nttl_secs = 0\npath = {:?}\n", db.display().to_string()),
    )
    .unwrap();

    let settings = Settings::load(Some(&config)).unwrap();
    let cache = FetcherCache::open(&settings).unwrap();
    assert_eq!(cache.ttl_secs(), 0);
    assert!(db.exists());

    let input = attrs(&[("url", "u")]);
    cache.add(&input, &attrs(&[])).unwrap();
    assert!(cache.lookup_expired2(&input).unwrap().unwrap().expired);
}
