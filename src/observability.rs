//! Metrics hooks for cache pools.

use std::time::Duration;

/// Receives hit/miss/error notifications from a [`CacheAdapter`](crate::CacheAdapter).
///
/// All methods default to no-ops so implementors only override what they
/// record.
pub trait CacheMetrics: Send + Sync {
    /// A lookup found a live item.
    fn record_hit(&self, _key: &str, _duration: Duration) {}

    /// A lookup found nothing, or only an expired item.
    fn record_miss(&self, _key: &str, _duration: Duration) {}

    /// A write was rejected or failed in the backend.
    fn record_error(&self, _key: &str, _reason: &str) {}
}

/// Metrics sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {}
