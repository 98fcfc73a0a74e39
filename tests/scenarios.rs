//! End-to-end scenarios through the pool manager.

use pool_cache::{CacheItem, CachePool, CachePoolExt, CacheSettings, Error, PoolManager, Ttl};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_set_has_delete() {
    init_logger();
    let manager = PoolManager::new();

    assert!(manager
        .set("foo", b"bar".to_vec(), Some(Ttl::Seconds(60)))
        .expect("Failed to set"));
    assert!(manager.has("foo").expect("Failed to check"));
    assert!(manager.delete("foo").expect("Failed to delete"));
    assert!(!manager.has("foo").expect("Failed to check"));
}

#[test]
fn test_set_expires_after_ttl() {
    init_logger();
    let manager = PoolManager::new();

    assert!(manager
        .set("foo", b"bar".to_vec(), Some(Ttl::Seconds(1)))
        .expect("Failed to set"));
    assert!(manager.has("foo").expect("Failed to check"));

    std::thread::sleep(Duration::from_millis(1100));
    assert!(!manager.has("foo").expect("Failed to check"));

    // reaped by the previous lookup
    let pool = manager.get_pool(None).expect("Failed to get pool");
    assert!(!pool.delete("foo").expect("Failed to delete"));
}

#[test]
fn test_unknown_pool() {
    init_logger();
    let manager = PoolManager::new();
    assert!(matches!(
        manager.get_pool(Some("nope")),
        Err(Error::UnknownPool(name)) if name == "nope"
    ));
}

#[test]
fn test_pools_are_isolated() {
    init_logger();
    let settings = CacheSettings::from_value(json!({
        "default": "sessions",
        "sessions": { "adapter": "memory" },
        "pages": { "adapter": "memory" },
    }))
    .expect("Failed to build settings");
    let manager = PoolManager::with_settings(settings);

    let sessions = manager.get_pool(Some("sessions")).expect("Failed to get pool");
    let pages = manager.get_pool(Some("pages")).expect("Failed to get pool");
    assert!(!Arc::ptr_eq(&sessions, &pages));

    manager
        .set("user", b"42".to_vec(), Some(Ttl::Seconds(60)))
        .expect("Failed to set");
    assert!(sessions.has("user").expect("Failed to check"));
    assert!(!pages.has("user").expect("Failed to check"));
}

#[test]
fn test_deferred_items_are_per_pool() {
    init_logger();
    let settings = CacheSettings::from_value(json!({
        "default": { "adapter": "memory" },
        "other": { "adapter": "memory" },
    }))
    .expect("Failed to build settings");
    let manager = PoolManager::with_settings(settings);
    let other = manager.get_pool(Some("other")).expect("Failed to get pool");

    let item = CacheItem::with_ttl("foo", b"bar".to_vec(), Some(Ttl::Seconds(60)))
        .expect("Failed to create item");
    other.save_deferred(item).expect("Failed to defer");

    assert!(manager.commit().expect("Failed to commit"));
    assert!(!other.has("foo").expect("Failed to check"));
    assert_eq!(other.deferred_len(), 1);

    assert!(other.commit().expect("Failed to commit"));
    assert!(other.has("foo").expect("Failed to check"));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user_id: u64,
    roles: Vec<String>,
}

#[cfg(feature = "sqlite")]
#[test]
fn test_typed_values_through_sqlite_pool() {
    init_logger();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = dir.path().join("sessions.db");

    let settings = CacheSettings::from_value(json!({
        "default": "sessions",
        "sessions": { "adapter": "sqlite", "arguments": [db.to_string_lossy()] },
    }))
    .expect("Failed to build settings");
    let manager = PoolManager::with_settings(settings.clone());

    let session = Session {
        user_id: 7,
        roles: vec!["admin".to_string()],
    };
    assert!(manager
        .set_value("session:7", &session, Some(Ttl::Seconds(60)))
        .expect("Failed to set"));

    // a second manager over the same database sees the stored value
    let reopened = PoolManager::with_settings(settings);
    let loaded: Option<Session> = reopened.get_value("session:7").expect("Failed to get");
    assert_eq!(loaded, Some(session));
}

#[cfg(feature = "file")]
#[test]
fn test_settings_file_with_file_pool() {
    init_logger();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache_dir = dir.path().join("cache");
    let settings_path = dir.path().join("cache.json");
    std::fs::write(
        &settings_path,
        json!({
            "default": "local",
            "local": { "adapter": "file", "arguments": [cache_dir.to_string_lossy()] },
        })
        .to_string(),
    )
    .expect("Failed to write settings");

    let manager = PoolManager::with_settings(
        CacheSettings::from_path(&settings_path).expect("Failed to load settings"),
    );

    assert!(manager
        .set("foo", b"bar".to_vec(), Some(Ttl::Seconds(60)))
        .expect("Failed to set"));
    assert_eq!(
        std::fs::read_dir(&cache_dir)
            .expect("Failed to read dir")
            .count(),
        1
    );
    assert_eq!(manager.get("foo").expect("Failed to get"), Some(b"bar".to_vec()));
}

#[cfg(feature = "file")]
#[test]
fn test_corrupt_file_entry_is_an_error() {
    init_logger();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let backend = pool_cache::backend::FileBackend::new(Some(dir.path().to_path_buf()))
        .expect("Failed to open backend");
    let pool = pool_cache::CacheAdapter::new(backend);

    pool.set("foo", b"bar".to_vec(), Some(Ttl::Seconds(60)))
        .expect("Failed to set");
    for entry in std::fs::read_dir(dir.path()).expect("Failed to read dir") {
        let path = entry.expect("Failed to read entry").path();
        std::fs::write(path, b"not an envelope").expect("Failed to overwrite");
    }

    assert!(matches!(
        pool.has("foo"),
        Err(Error::CorruptEntry { key, .. }) if key == "foo"
    ));
    // the corrupt file was dropped; the key now reads as a plain miss
    assert!(!pool.has("foo").expect("Failed to check"));
}
