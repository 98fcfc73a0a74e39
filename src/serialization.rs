//! Stored representation of cache items.
//!
//! File and SQLite backends persist items as a versioned envelope:
//!
//! ```text
//! [MAGIC: 4 bytes] [VERSION: 4 bytes LE] [POSTCARD PAYLOAD]
//! ```
//!
//! The payload carries the key, the opaque value and the expiration as
//! microseconds since the Unix epoch. Anything that does not decode cleanly
//! is reported as [`Error::CorruptEntry`].

use crate::error::{Error, Result};
use crate::item::CacheItem;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Magic header for stored items.
pub const CACHE_MAGIC: [u8; 4] = *b"PCIT";

/// Current envelope version. Bump when the payload layout changes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

#[derive(Serialize)]
struct StoredItem<'a> {
    key: &'a str,
    value: &'a [u8],
    expires_at_micros: i64,
}

#[derive(Deserialize)]
struct OwnedStoredItem {
    key: String,
    value: Vec<u8>,
    expires_at_micros: i64,
}

/// Encode an item into its stored envelope.
pub fn encode_item(item: &CacheItem) -> Result<Vec<u8>> {
    let stored = StoredItem {
        key: item.key(),
        value: item.payload(),
        expires_at_micros: to_micros(item.expiration()),
    };

    let payload = postcard::to_allocvec(&stored)
        .map_err(|e| Error::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&CACHE_MAGIC);
    bytes.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a stored envelope back into an item.
///
/// `key` is the key the caller looked up; it is used for error reporting and
/// must match the key recorded in the payload.
///
/// # Errors
/// `Error::CorruptEntry` for a short buffer, bad magic, unknown version,
/// undecodable payload or a key mismatch.
pub fn decode_item(key: &str, bytes: &[u8]) -> Result<CacheItem> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::corrupt(key, "envelope too short"));
    }

    let (header, payload) = bytes.split_at(HEADER_LEN);
    if header[..4] != CACHE_MAGIC {
        return Err(Error::corrupt(key, "invalid magic header"));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&header[4..]);
    let version = u32::from_le_bytes(version);
    if version != CURRENT_SCHEMA_VERSION {
        return Err(Error::corrupt(
            key,
            format!(
                "schema version {} (expected {})",
                version, CURRENT_SCHEMA_VERSION
            ),
        ));
    }

    let stored: OwnedStoredItem =
        postcard::from_bytes(payload).map_err(|e| Error::corrupt(key, e))?;

    if stored.key != key {
        return Err(Error::corrupt(
            key,
            format!("payload belongs to key \"{}\"", stored.key),
        ));
    }

    Ok(CacheItem::from_parts(
        stored.key,
        stored.value,
        from_micros(stored.expires_at_micros),
    ))
}

/// Encode a typed value with postcard.
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value).map_err(|e| Error::SerializationError(e.to_string()))
}

/// Decode a typed value with postcard.
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    postcard::from_bytes(bytes).map_err(|e| Error::DeserializationError(e.to_string()))
}

fn to_micros(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_micros()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_micros())
            .map(|m| -m)
            .unwrap_or(i64::MIN),
    }
}

fn from_micros(micros: i64) -> SystemTime {
    let magnitude = Duration::from_micros(micros.unsigned_abs());
    if micros >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}
