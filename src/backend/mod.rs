//! Storage backends.
//!
//! A backend only supplies the storage primitives. Expiry checks, key
//! validation, batching and deferred writes live in
//! [`CacheAdapter`](crate::adapter::CacheAdapter), so every backend gets the
//! same semantics.

use crate::error::Result;
use crate::item::CacheItem;

pub mod memory;

#[cfg(feature = "file")]
pub mod file;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryBackend;

#[cfg(feature = "file")]
pub use file::FileBackend;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteBackend, SqliteOptions};

/// Storage primitives every cache medium implements.
///
/// I/O failures are handled inside the backend: they are logged and
/// reported as `None` / `false`. Only a stored payload that cannot be decoded
/// surfaces as an error.
pub trait CacheBackend: Send + Sync {
    /// Short backend identifier used in log lines.
    fn name(&self) -> &'static str;

    /// Look up the stored item for `key`. No expiry judgement is made here.
    ///
    /// # Errors
    /// `Error::CorruptEntry` when the stored bytes are not a valid item.
    fn fetch(&self, key: &str) -> Result<Option<CacheItem>>;

    /// Remove the item for `key`. Returns true iff something was removed.
    fn remove(&self, key: &str) -> bool;

    /// Store `item`, overwriting any previous value for its key.
    fn persist(&self, item: &CacheItem) -> bool;

    /// Remove every stored item.
    fn clear(&self) -> bool;

    /// Remove the item for `key` only if it is expired at the time of
    /// removal. A live item written since the last `fetch` is kept.
    ///
    /// The default re-reads before removing, which narrows the window but
    /// does not close it; backends that can check and remove atomically
    /// override this.
    fn remove_expired(&self, key: &str) -> bool {
        match self.fetch(key) {
            Ok(Some(item)) if !item.is_hit() => self.remove(key),
            _ => false,
        }
    }
}

impl<B: CacheBackend + ?Sized> CacheBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fetch(&self, key: &str) -> Result<Option<CacheItem>> {
        (**self).fetch(key)
    }

    fn remove(&self, key: &str) -> bool {
        (**self).remove(key)
    }

    fn persist(&self, item: &CacheItem) -> bool {
        (**self).persist(item)
    }

    fn clear(&self) -> bool {
        (**self).clear()
    }

    fn remove_expired(&self, key: &str) -> bool {
        (**self).remove_expired(key)
    }
}
