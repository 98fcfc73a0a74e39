//! In-memory cache backend.

use super::CacheBackend;
use crate::error::Result;
use crate::item::CacheItem;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local backend keeping items in a concurrent map.
///
/// Clones share the same storage.
///
/// # Example
///
/// ```
/// use pool_cache::backend::{CacheBackend, MemoryBackend};
/// use pool_cache::{CacheItem, Ttl};
///
/// let backend = MemoryBackend::new();
/// let item = CacheItem::with_ttl("key", b"value".to_vec(), Some(Ttl::Seconds(60))).unwrap();
/// assert!(backend.persist(&item));
/// assert_eq!(backend.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryBackend {
    items: Arc<DashMap<String, CacheItem>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items, expired ones included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn fetch(&self, key: &str) -> Result<Option<CacheItem>> {
        Ok(self.items.get(key).map(|entry| entry.value().clone()))
    }

    fn remove(&self, key: &str) -> bool {
        self.items.remove(key).is_some()
    }

    fn persist(&self, item: &CacheItem) -> bool {
        self.items.insert(item.key().to_string(), item.clone());
        true
    }

    fn clear(&self) -> bool {
        self.items.clear();
        true
    }

    fn remove_expired(&self, key: &str) -> bool {
        self.items.remove_if(key, |_, item| !item.is_hit()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Ttl;

    fn item(key: &str, value: &[u8]) -> CacheItem {
        CacheItem::with_ttl(key, value.to_vec(), Some(Ttl::Seconds(60)))
            .expect("Failed to create item")
    }

    #[test]
    fn test_fetch_missing() {
        let backend = MemoryBackend::new();
        assert!(backend.fetch("missing").expect("Failed to fetch").is_none());
    }

    #[test]
    fn test_persist_overwrites() {
        let backend = MemoryBackend::new();
        assert!(backend.persist(&item("k", b"one")));
        assert!(backend.persist(&item("k", b"two")));

        let stored = backend
            .fetch("k")
            .expect("Failed to fetch")
            .expect("Item not found");
        assert_eq!(stored.get(), Some(&b"two"[..]));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_fetch_returns_expired_items() {
        let backend = MemoryBackend::new();
        let expired = CacheItem::new("old", b"x".to_vec()).expect("Failed to create item");
        assert!(backend.persist(&expired));

        let stored = backend.fetch("old").expect("Failed to fetch");
        assert!(stored.is_some_and(|i| !i.is_hit()));
    }

    #[test]
    fn test_remove_reports_absence() {
        let backend = MemoryBackend::new();
        assert!(!backend.remove("k"));
        backend.persist(&item("k", b"v"));
        assert!(backend.remove("k"));
        assert!(!backend.remove("k"));
    }

    #[test]
    fn test_remove_expired_keeps_live_items() {
        let backend = MemoryBackend::new();
        backend.persist(&item("live", b"v"));
        backend.persist(&CacheItem::new("old", b"x".to_vec()).expect("Failed to create item"));

        assert!(!backend.remove_expired("live"));
        assert!(!backend.remove_expired("missing"));
        assert!(backend.remove_expired("old"));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_clear_and_shared_clones() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.persist(&item("a", b"1"));
        backend.persist(&item("b", b"2"));
        assert_eq!(other.len(), 2);

        assert!(other.clear());
        assert!(backend.is_empty());
    }
}
