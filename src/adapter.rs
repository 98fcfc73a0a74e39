//! Cache adapter - the shared engine on top of a storage backend.
//!
//! [`CacheAdapter`] turns the four [`CacheBackend`] primitives into the full
//! pool surface described by [`CachePool`]: key validation, lazy expiry,
//! batch operations, deferred writes and the simple key/value API.

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::item::{validate_key, CacheItem, Ttl};
use crate::observability::{CacheMetrics, NoOpMetrics};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Operations every cache pool offers.
///
/// `Err` is reserved for structural misuse (empty keys, corrupt stored
/// entries, unresolvable pools). Misses, expired items and storage failures
/// come back as `Ok(false)` / `Ok(None)`.
pub trait CachePool: Send + Sync {
    /// True if a live item exists for `key`.
    ///
    /// An expired item found on the way is removed from the backend.
    fn has_item(&self, key: &str) -> Result<bool>;

    /// Stored item for `key`, or a not-hit placeholder when there is none.
    fn get_item(&self, key: &str) -> Result<CacheItem>;

    /// [`get_item`](Self::get_item) for each key, in input order.
    fn get_items(&self, keys: &[&str]) -> Result<Vec<CacheItem>>;

    /// Persist `item` now. Expired items are rejected with `Ok(false)`.
    fn save(&self, item: &CacheItem) -> Result<bool>;

    /// Queue `item` for the next [`commit`](Self::commit). Always succeeds.
    fn save_deferred(&self, item: CacheItem) -> Result<bool>;

    /// Save queued items in FIFO order, stopping at the first failure.
    ///
    /// The failing item is consumed; items queued after it stay in the queue
    /// and are not processed by this call.
    fn commit(&self) -> Result<bool>;

    /// Remove the item for `key`. `Ok(false)` if there was nothing to remove.
    fn delete_item(&self, key: &str) -> Result<bool>;

    /// Remove every key, stopping at the first key that could not be removed.
    ///
    /// Reports `Ok(false)` as soon as one key was absent, even though the end
    /// state is the same as if it had been present.
    fn delete_items(&self, keys: &[&str]) -> Result<bool>;

    /// Wipe the backend and drop any pending deferred items.
    fn clear(&self) -> Result<bool>;

    fn has(&self, key: &str) -> Result<bool> {
        self.has_item(key)
    }

    /// Payload for `key` if a live item exists.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if !self.has_item(key)? {
            return Ok(None);
        }
        Ok(self.get_item(key)?.get().map(<[u8]>::to_vec))
    }

    /// Store `value` under `key` for `ttl` (`None` stores nothing: the item
    /// would already be expired).
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Ttl>) -> Result<bool> {
        let item = CacheItem::with_ttl(key, value, ttl)?;
        self.save(&item)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.delete_item(key)
    }

    /// `(key, payload)` pairs in input order; missing or expired keys map to
    /// `None`.
    fn get_multiple(&self, keys: &[&str]) -> Result<Vec<(String, Option<Vec<u8>>)>> {
        Ok(self
            .get_items(keys)?
            .into_iter()
            .map(|item| {
                let value = item.get().map(<[u8]>::to_vec);
                (item.key().to_string(), value)
            })
            .collect())
    }

    /// [`set`](Self::set) each pair, stopping at the first failure.
    fn set_multiple(&self, values: &[(&str, &[u8])], ttl: Option<Ttl>) -> Result<bool> {
        for (key, value) in values {
            if !self.set(key, value.to_vec(), ttl)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn delete_multiple(&self, keys: &[&str]) -> Result<bool> {
        self.delete_items(keys)
    }
}

/// Typed convenience methods, available on every [`CachePool`].
///
/// Values are encoded with postcard.
pub trait CachePoolExt: CachePool {
    /// Decode the live payload for `key` with postcard.
    fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        if !self.has_item(key)? {
            return Ok(None);
        }
        self.get_item(key)?.get_as()
    }

    /// [`get_value`](Self::get_value), falling back to `default` on a miss.
    fn get_value_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get_value(key)?.unwrap_or(default))
    }

    /// Encode `value` with postcard and store it for `ttl`.
    fn set_value<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Ttl>,
    ) -> Result<bool> {
        let item = CacheItem::from_value(key, value, ttl)?;
        self.save(&item)
    }
}

impl<P: CachePool + ?Sized> CachePoolExt for P {}

/// Cache pool over a single backend.
///
/// The type parameter defaults to a boxed `dyn CacheBackend`, which is what
/// [`PoolManager`](crate::PoolManager) hands out.
///
/// # Example
///
/// ```
/// use pool_cache::backend::MemoryBackend;
/// use pool_cache::{CacheAdapter, CachePool, Ttl};
///
/// let pool = CacheAdapter::new(MemoryBackend::new());
/// assert!(pool.set("foo", b"bar".to_vec(), Some(Ttl::Seconds(60))).unwrap());
/// assert!(pool.has("foo").unwrap());
/// assert_eq!(pool.get("foo").unwrap(), Some(b"bar".to_vec()));
/// ```
pub struct CacheAdapter<B: CacheBackend + ?Sized = Box<dyn CacheBackend>> {
    deferred: Mutex<VecDeque<CacheItem>>,
    metrics: Box<dyn CacheMetrics>,
    backend: B,
}

impl<B: CacheBackend> CacheAdapter<B> {
    /// Create a new adapter over `backend`.
    pub fn new(backend: B) -> Self {
        CacheAdapter {
            deferred: Mutex::new(VecDeque::new()),
            metrics: Box::new(NoOpMetrics),
            backend,
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl<B: CacheBackend + ?Sized> CacheAdapter<B> {
    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of items waiting for [`commit`](CachePool::commit).
    pub fn deferred_len(&self) -> usize {
        self.queue().len()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<CacheItem>> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: CacheBackend + ?Sized> CachePool for CacheAdapter<B> {
    fn has_item(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let Some(item) = self.backend.fetch(key)? else {
            return Ok(false);
        };

        if !item.is_hit() {
            debug!("✗ {} item {} expired, reaping", self.backend.name(), key);
            self.backend.remove_expired(key);
            return Ok(false);
        }

        Ok(true)
    }

    fn get_item(&self, key: &str) -> Result<CacheItem> {
        validate_key(key)?;
        let timer = Instant::now();

        match self.backend.fetch(key)? {
            Some(item) if item.is_hit() => {
                debug!("✓ {} GET {} -> HIT", self.backend.name(), key);
                self.metrics.record_hit(key, timer.elapsed());
                Ok(item)
            }
            Some(item) => {
                debug!("✓ {} GET {} -> EXPIRED", self.backend.name(), key);
                self.metrics.record_miss(key, timer.elapsed());
                Ok(item)
            }
            None => {
                debug!("✓ {} GET {} -> MISS", self.backend.name(), key);
                self.metrics.record_miss(key, timer.elapsed());
                CacheItem::new(key, Vec::new())
            }
        }
    }

    fn get_items(&self, keys: &[&str]) -> Result<Vec<CacheItem>> {
        keys.iter().map(|key| self.get_item(key)).collect()
    }

    fn save(&self, item: &CacheItem) -> Result<bool> {
        validate_key(item.key())?;

        if !item.is_hit() {
            debug!("✗ Refusing to save expired item {}", item.key());
            self.metrics.record_error(item.key(), "item already expired");
            return Ok(false);
        }

        let saved = self.backend.persist(item);
        if saved {
            debug!("✓ {} SET {}", self.backend.name(), item.key());
        } else {
            self.metrics.record_error(item.key(), "backend rejected write");
        }
        Ok(saved)
    }

    fn save_deferred(&self, item: CacheItem) -> Result<bool> {
        self.queue().push_back(item);
        Ok(true)
    }

    fn commit(&self) -> Result<bool> {
        loop {
            // pop under the lock, save without it
            let next = self.queue().pop_front();
            let Some(item) = next else {
                return Ok(true);
            };

            if !self.save(&item)? {
                debug!(
                    "✗ Commit stopped at {} ({} item(s) left queued)",
                    item.key(),
                    self.deferred_len()
                );
                return Ok(false);
            }
        }
    }

    fn delete_item(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let removed = self.backend.remove(key);
        debug!(
            "✓ {} DELETE {} ({})",
            self.backend.name(),
            key,
            if removed { "removed" } else { "absent" }
        );
        Ok(removed)
    }

    fn delete_items(&self, keys: &[&str]) -> Result<bool> {
        for key in keys {
            if !self.delete_item(key)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn clear(&self) -> Result<bool> {
        self.queue().clear();
        Ok(self.backend.clear())
    }
}
