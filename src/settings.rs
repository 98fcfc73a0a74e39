//! Pool configuration tree.
//!
//! Each top-level entry maps a pool name to either another pool name (an
//! alias) or an adapter record:
//!
//! ```json
//! {
//!     "default": "local",
//!     "local": { "adapter": "file", "arguments": ["/var/cache/myapp"] },
//!     "sessions": { "adapter": "sqlite", "arguments": ["sessions.db"] }
//! }
//! ```

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// Read-only lookup of pool configuration by name.
pub trait SettingsSource: Send + Sync {
    /// Configuration value for `name`, if any.
    fn get(&self, name: &str) -> Option<Value>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// JSON-backed pool settings.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheSettings {
    entries: Map<String, Value>,
}

impl CacheSettings {
    /// Pool used when no name is given.
    pub const DEFAULT: &'static str = "default";
    /// Adapter identifier field of an adapter record.
    pub const ADAPTER: &'static str = "adapter";
    /// Constructor argument list field of an adapter record.
    pub const ARGUMENTS: &'static str = "arguments";

    /// Build settings from a JSON object.
    ///
    /// # Errors
    /// `Error::ConfigError` if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(entries) => Ok(CacheSettings { entries }),
            other => Err(Error::ConfigError(format!(
                "pool settings must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse settings from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Configured pool names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.into_iter()
    }
}

impl Default for CacheSettings {
    /// A single in-memory pool, reachable as `"default"` and `"memory"`.
    fn default() -> Self {
        let mut memory = Map::new();
        memory.insert(Self::ADAPTER.to_string(), Value::from("memory"));

        let mut entries = Map::new();
        entries.insert(Self::DEFAULT.to_string(), Value::from("memory"));
        entries.insert("memory".to_string(), Value::Object(memory));

        CacheSettings { entries }
    }
}

impl SettingsSource for CacheSettings {
    fn get(&self, name: &str) -> Option<Value> {
        self.entries.get(name).cloned()
    }

    fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
