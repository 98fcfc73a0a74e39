//! Error types for cache operations.
//!
//! Only structural misuse is reported through [`Error`]: bad keys, bad pool
//! configuration, corrupted stored payloads. Expected runtime conditions
//! (miss, expired entry, storage temporarily unavailable) are reported as
//! `Ok(false)` / `Ok(None)` by the pool operations instead.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by cache items, pools and the pool manager.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Key is empty or whitespace only.
    #[error("cache item key must be a non-empty string")]
    InvalidKey,

    /// No configuration entry exists for the requested pool.
    #[error("invalid pool name \"{0}\"")]
    UnknownPool(String),

    /// Pool configuration is neither an alias nor an adapter record.
    #[error("invalid config type for pool \"{0}\"")]
    InvalidPoolConfig(String),

    /// Adapter identifier does not name a registered backend.
    #[error("invalid adapter type for pool \"{0}\"")]
    InvalidAdapter(String),

    /// Constructor arguments for a pool are malformed.
    #[error("invalid arguments for pool \"{pool}\": {reason}")]
    InvalidArguments { pool: String, reason: String },

    /// Alias chain loops back onto a name already being resolved.
    #[error("cyclic pool alias: {}", .0.join(" -> "))]
    CyclicAlias(Vec<String>),

    /// Stored payload could not be decoded into a cache item.
    #[error("corrupt cache entry for key \"{key}\": {reason}")]
    CorruptEntry { key: String, reason: String },

    /// Directory for the file backend is missing or not writable.
    #[error("\"{}\" isn't a valid cache directory", .0.display())]
    InvalidDirectory(PathBuf),

    /// Backend could not be initialized (connection or schema setup).
    #[error("backend error: {0}")]
    BackendError(String),

    /// Settings tree could not be loaded.
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),

    #[error("deserialization failed: {0}")]
    DeserializationError(String),
}

impl Error {
    pub(crate) fn invalid_arguments(pool: &str, reason: impl Into<String>) -> Self {
        Error::InvalidArguments {
            pool: pool.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(key: &str, reason: impl std::fmt::Display) -> Self {
        Error::CorruptEntry {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ConfigError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::InvalidKey.to_string(),
            "cache item key must be a non-empty string"
        );
        assert_eq!(
            Error::UnknownPool("foo".to_string()).to_string(),
            "invalid pool name \"foo\""
        );
        assert_eq!(
            Error::CyclicAlias(vec!["a".into(), "b".into(), "a".into()]).to_string(),
            "cyclic pool alias: a -> b -> a"
        );
    }

    #[test]
    fn test_invalid_arguments_helper() {
        match Error::invalid_arguments("default", "expected an array") {
            Error::InvalidArguments { pool, reason } => {
                assert_eq!(pool, "default");
                assert_eq!(reason, "expected an array");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
