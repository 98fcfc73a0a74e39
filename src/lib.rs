//! # pool-cache
//!
//! Named cache pools over interchangeable storage backends.
//!
//! ## Features
//!
//! - **One contract, many media:** in-memory, filesystem and SQLite backends
//!   implement four primitives; expiry, batching and deferred writes are
//!   shared by all of them
//! - **Lazy expiry:** items carry an absolute expiration and are reaped only
//!   when a lookup finds them expired, never by a background sweep
//! - **Deferred writes:** queue items and persist them in one `commit`
//! - **Pool manager:** resolve named pools (and aliases) from a JSON settings
//!   tree, created once and shared for the lifetime of the manager
//!
//! ## Quick Start
//!
//! ```
//! use pool_cache::{CacheItem, CachePool, PoolManager, Ttl};
//!
//! // The default settings provide a single in-memory pool.
//! let manager = PoolManager::new();
//!
//! manager.set("foo", b"bar".to_vec(), Some(Ttl::Seconds(60))).unwrap();
//! assert!(manager.has("foo").unwrap());
//!
//! let item = CacheItem::with_ttl("later", b"queued".to_vec(), Some(Ttl::Seconds(60))).unwrap();
//! manager.save_deferred(item).unwrap();
//! assert!(manager.commit().unwrap());
//!
//! manager.delete("foo").unwrap();
//! assert!(!manager.has("foo").unwrap());
//! ```

#[macro_use]
extern crate log;

pub mod adapter;
pub mod backend;
pub mod error;
pub mod item;
pub mod manager;
pub mod observability;
pub mod serialization;
pub mod settings;

// Re-exports for convenience
pub use adapter::{CacheAdapter, CachePool, CachePoolExt};
pub use backend::CacheBackend;
pub use error::{Error, Result};
pub use item::{CacheItem, Ttl};
pub use manager::{AdapterRegistry, PoolManager};
pub use observability::CacheMetrics;
pub use settings::{CacheSettings, SettingsSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
