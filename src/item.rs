//! Cache item: a key, an opaque payload and an absolute expiration time.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, SystemTime};

/// Upper bound applied when a TTL would overflow `SystemTime`.
const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Relative lifetime of a cache item.
///
/// There is no "never expires" value: callers that want long retention pass
/// a large duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ttl {
    /// Seconds from now. Zero or negative values expire immediately.
    Seconds(i64),
    /// Duration from now.
    Duration(Duration),
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Ttl::Seconds(secs)
    }
}

impl From<u64> for Ttl {
    fn from(secs: u64) -> Self {
        Ttl::Duration(Duration::from_secs(secs))
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Ttl::Duration(d)
    }
}

impl Ttl {
    /// Absolute expiration relative to `now`.
    pub(crate) fn deadline_from(self, now: SystemTime) -> SystemTime {
        match self {
            Ttl::Seconds(secs) if secs >= 0 => later(now, Duration::from_secs(secs as u64)),
            Ttl::Seconds(secs) => now
                .checked_sub(Duration::from_secs(secs.unsigned_abs()))
                .map_or(SystemTime::UNIX_EPOCH, |t| t.max(SystemTime::UNIX_EPOCH)),
            Ttl::Duration(d) => later(now, d),
        }
    }
}

fn later(now: SystemTime, d: Duration) -> SystemTime {
    now.checked_add(d)
        .unwrap_or_else(|| now + MAX_LIFETIME)
}

/// Key/value pair with an absolute expiration timestamp.
///
/// Mutators return `&mut Self`, so an item sitting in a deferred queue or
/// held by the caller reflects the latest change.
///
/// # Example
///
/// ```
/// use pool_cache::{CacheItem, Ttl};
///
/// let mut item = CacheItem::new("greeting", b"hello".to_vec()).unwrap();
/// assert!(!item.is_hit()); // new items start expired
///
/// item.expires_after(Some(Ttl::Seconds(60)));
/// assert!(item.is_hit());
/// assert_eq!(item.get(), Some(&b"hello"[..]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheItem {
    key: String,
    value: Vec<u8>,
    expires_at: SystemTime,
}

impl CacheItem {
    /// Create an item that is already expired.
    ///
    /// # Errors
    /// `Error::InvalidKey` when `key` is empty or whitespace only.
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;

        Ok(CacheItem {
            key,
            value,
            expires_at: SystemTime::now(),
        })
    }

    /// Create an item expiring after `ttl` (`None` means already expired).
    pub fn with_ttl(key: impl Into<String>, value: Vec<u8>, ttl: Option<Ttl>) -> Result<Self> {
        let mut item = Self::new(key, value)?;
        item.expires_after(ttl);
        Ok(item)
    }

    /// Create an item whose payload is `value` encoded with postcard.
    pub fn from_value<T: Serialize + ?Sized>(
        key: impl Into<String>,
        value: &T,
        ttl: Option<Ttl>,
    ) -> Result<Self> {
        let bytes = crate::serialization::encode_value(value)?;
        Self::with_ttl(key, bytes, ttl)
    }

    /// Rebuild an item from stored parts without touching its expiration.
    pub(crate) fn from_parts(key: String, value: Vec<u8>, expires_at: SystemTime) -> Self {
        CacheItem {
            key,
            value,
            expires_at,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn expiration(&self) -> SystemTime {
        self.expires_at
    }

    /// Raw payload regardless of expiry.
    pub(crate) fn payload(&self) -> &[u8] {
        &self.value
    }

    /// Replace the payload.
    pub fn set(&mut self, value: Vec<u8>) -> &mut Self {
        self.value = value;
        self
    }

    /// Replace the expiration with `now + ttl`; `None` expires the item now.
    pub fn expires_after(&mut self, ttl: Option<Ttl>) -> &mut Self {
        let now = SystemTime::now();
        self.expires_at = match ttl {
            Some(ttl) => ttl.deadline_from(now),
            None => now,
        };
        self
    }

    /// Replace the expiration with an absolute instant; `None` means now.
    pub fn expires_at(&mut self, at: Option<SystemTime>) -> &mut Self {
        self.expires_at = at.unwrap_or_else(SystemTime::now);
        self
    }

    /// True while the current time is strictly before the expiration.
    ///
    /// Re-evaluated on every call.
    pub fn is_hit(&self) -> bool {
        SystemTime::now() < self.expires_at
    }

    /// Payload if the item is a hit.
    pub fn get(&self) -> Option<&[u8]> {
        if self.is_hit() {
            Some(&self.value)
        } else {
            None
        }
    }

    /// Decode the payload of a hit item with postcard.
    ///
    /// # Errors
    /// `Error::DeserializationError` when the payload is not a `T`.
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.get()
            .map(crate::serialization::decode_value)
            .transpose()
    }
}

/// Reject empty and whitespace-only keys.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidKey);
    }
    Ok(())
}
