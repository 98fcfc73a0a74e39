//! Pool manager - resolves named pools from settings.

use crate::adapter::{CacheAdapter, CachePool};
use crate::backend::{CacheBackend, MemoryBackend};
use crate::error::{Error, Result};
use crate::item::CacheItem;
use crate::settings::{json_kind, CacheSettings, SettingsSource};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a backend from the `arguments` list of an adapter record.
///
/// The first parameter is the pool name, for error messages.
pub type AdapterFactory =
    dyn Fn(&str, &[Value]) -> Result<Box<dyn CacheBackend>> + Send + Sync + 'static;

const NO_ARGUMENTS: &[Value] = &[];

/// Adapter identifiers usable in the `adapter` field of pool settings.
///
/// Built-in identifiers:
///
/// | adapter  | arguments |
/// |----------|-----------|
/// | `memory` | none |
/// | `file`   | `[directory?]` |
/// | `sqlite` | `[path or ":memory:"?, table?, key_column?, value_column?]` |
#[derive(Clone)]
pub struct AdapterRegistry {
    factories: HashMap<String, Arc<AdapterFactory>>,
}

impl AdapterRegistry {
    /// Registry without any adapter.
    pub fn empty() -> Self {
        AdapterRegistry {
            factories: HashMap::new(),
        }
    }

    /// Register (or replace) an adapter identifier.
    ///
    /// # Example
    ///
    /// ```
    /// use pool_cache::backend::MemoryBackend;
    /// use pool_cache::AdapterRegistry;
    ///
    /// let mut registry = AdapterRegistry::default();
    /// registry.register("scratch", |_pool, _args| Ok(Box::new(MemoryBackend::new())));
    /// assert!(registry.contains("scratch"));
    /// ```
    pub fn register<F>(&mut self, adapter: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str, &[Value]) -> Result<Box<dyn CacheBackend>> + Send + Sync + 'static,
    {
        self.factories.insert(adapter.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, adapter: &str) -> bool {
        self.factories.contains_key(adapter)
    }

    fn build(
        &self,
        pool: &str,
        adapter: &str,
        arguments: &[Value],
    ) -> Result<Box<dyn CacheBackend>> {
        let factory = self
            .factories
            .get(adapter)
            .ok_or_else(|| Error::InvalidAdapter(pool.to_string()))?;
        factory(pool, arguments)
    }
}

impl Default for AdapterRegistry {
    /// Registry with every built-in adapter enabled by crate features.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("memory", memory_factory);
        #[cfg(feature = "file")]
        registry.register("file", file_factory);
        #[cfg(feature = "sqlite")]
        registry.register("sqlite", sqlite_factory);
        registry
    }
}

fn memory_factory(pool: &str, arguments: &[Value]) -> Result<Box<dyn CacheBackend>> {
    if !arguments.is_empty() {
        return Err(Error::invalid_arguments(
            pool,
            "memory adapter takes no arguments",
        ));
    }
    Ok(Box::new(MemoryBackend::new()))
}

/// Optional string argument at `index`; `null` counts as absent.
fn string_arg<'a>(pool: &str, arguments: &'a [Value], index: usize) -> Result<Option<&'a str>> {
    match arguments.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(Error::invalid_arguments(
            pool,
            format!("argument {} must be a string, got {}", index, json_kind(other)),
        )),
    }
}

fn ensure_at_most(pool: &str, arguments: &[Value], max: usize) -> Result<()> {
    if arguments.len() > max {
        return Err(Error::invalid_arguments(
            pool,
            format!("expected at most {} argument(s), got {}", max, arguments.len()),
        ));
    }
    Ok(())
}

#[cfg(feature = "file")]
fn file_factory(pool: &str, arguments: &[Value]) -> Result<Box<dyn CacheBackend>> {
    use crate::backend::FileBackend;

    ensure_at_most(pool, arguments, 1)?;
    let directory = string_arg(pool, arguments, 0)?.map(std::path::PathBuf::from);
    Ok(Box::new(FileBackend::new(directory)?))
}

#[cfg(feature = "sqlite")]
fn sqlite_factory(pool: &str, arguments: &[Value]) -> Result<Box<dyn CacheBackend>> {
    use crate::backend::{SqliteBackend, SqliteOptions};

    ensure_at_most(pool, arguments, 4)?;

    let mut options = SqliteOptions::default();
    if let Some(table) = string_arg(pool, arguments, 1)? {
        options.table = table.to_string();
    }
    if let Some(column) = string_arg(pool, arguments, 2)? {
        options.key_column = column.to_string();
    }
    if let Some(column) = string_arg(pool, arguments, 3)? {
        options.value_column = column.to_string();
    }

    let path = match string_arg(pool, arguments, 0)? {
        None | Some(":memory:") => None,
        Some(path) => Some(std::path::Path::new(path)),
    };

    let backend = SqliteBackend::with_options(path, options).map_err(|e| match e {
        Error::InvalidArguments { reason, .. } => Error::invalid_arguments(pool, reason),
        other => other,
    })?;
    Ok(Box::new(backend))
}

/// Resolves pool names to live, shared [`CacheAdapter`]s.
///
/// Pools are created on first use and kept for the lifetime of the manager:
/// asking twice for the same name yields the same instance. The manager is
/// itself a [`CachePool`] that forwards every call to the default pool.
///
/// # Example
///
/// ```
/// use pool_cache::{CachePool, CacheSettings, PoolManager, Ttl};
/// use std::sync::Arc;
///
/// let settings = CacheSettings::from_json_str(r#"{
///     "default": "primary",
///     "primary": { "adapter": "memory" }
/// }"#).unwrap();
/// let manager = PoolManager::with_settings(settings);
///
/// let pool = manager.get_pool(Some("primary")).unwrap();
/// assert!(Arc::ptr_eq(&pool, &manager.get_pool(None).unwrap()));
///
/// manager.set("foo", b"bar".to_vec(), Some(Ttl::Seconds(60))).unwrap();
/// assert!(pool.has("foo").unwrap());
/// ```
pub struct PoolManager {
    settings: Box<dyn SettingsSource>,
    registry: AdapterRegistry,
    pools: DashMap<String, Arc<CacheAdapter>>,
}

impl PoolManager {
    /// Manager over the default settings (a single in-memory pool).
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    pub fn with_settings(settings: impl SettingsSource + 'static) -> Self {
        PoolManager {
            settings: Box::new(settings),
            registry: AdapterRegistry::default(),
            pools: DashMap::new(),
        }
    }

    /// Replace the adapter registry used for pools not yet resolved.
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Resolve `name` (or the default pool) to its adapter.
    ///
    /// # Errors
    /// - `Error::UnknownPool`: no settings entry for a name in the chain
    /// - `Error::CyclicAlias`: an alias chain loops
    /// - `Error::InvalidPoolConfig`: entry is neither a string nor an object
    /// - `Error::InvalidAdapter`: `adapter` missing, not a string or unknown
    /// - `Error::InvalidArguments`: `arguments` not an array, or rejected by
    ///   the adapter
    /// - any error raised while opening the backend
    pub fn get_pool(&self, name: Option<&str>) -> Result<Arc<CacheAdapter>> {
        let name = name.unwrap_or(CacheSettings::DEFAULT);
        let mut chain = Vec::new();
        self.resolve(name, &mut chain)
    }

    /// Names resolved so far (aliases included).
    pub fn pool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn resolve(&self, name: &str, chain: &mut Vec<String>) -> Result<Arc<CacheAdapter>> {
        if let Some(pool) = self.cached(name) {
            return Ok(pool);
        }

        if chain.iter().any(|seen| seen == name) {
            chain.push(name.to_string());
            return Err(Error::CyclicAlias(std::mem::take(chain)));
        }
        chain.push(name.to_string());

        let config = self
            .settings
            .get(name)
            .ok_or_else(|| Error::UnknownPool(name.to_string()))?;

        let pool: Arc<CacheAdapter> = match config {
            Value::String(alias) => {
                debug!("Pool {} is an alias of {}", name, alias);
                self.resolve(&alias, chain)?
            }
            Value::Object(record) => {
                let adapter = match record.get(CacheSettings::ADAPTER) {
                    Some(Value::String(adapter)) => adapter.as_str(),
                    _ => return Err(Error::InvalidAdapter(name.to_string())),
                };

                let arguments = match record.get(CacheSettings::ARGUMENTS) {
                    None | Some(Value::Null) => NO_ARGUMENTS,
                    Some(Value::Array(arguments)) => arguments.as_slice(),
                    Some(other) => {
                        return Err(Error::invalid_arguments(
                            name,
                            format!("arguments must be an array, got {}", json_kind(other)),
                        ))
                    }
                };

                let backend = self.registry.build(name, adapter, arguments)?;
                info!("✓ Pool {} initialized with {} adapter", name, backend.name());
                Arc::new(CacheAdapter::new(backend))
            }
            _ => return Err(Error::InvalidPoolConfig(name.to_string())),
        };

        // first resolution wins if another thread got here meanwhile
        Ok(self
            .pools
            .entry(name.to_string())
            .or_insert(pool)
            .value()
            .clone())
    }

    fn cached(&self, name: &str) -> Option<Arc<CacheAdapter>> {
        self.pools.get(name).map(|pool| Arc::clone(pool.value()))
    }

    fn default_pool(&self) -> Result<Arc<CacheAdapter>> {
        self.get_pool(None)
    }
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CachePool for PoolManager {
    fn has_item(&self, key: &str) -> Result<bool> {
        self.default_pool()?.has_item(key)
    }

    fn get_item(&self, key: &str) -> Result<CacheItem> {
        self.default_pool()?.get_item(key)
    }

    fn get_items(&self, keys: &[&str]) -> Result<Vec<CacheItem>> {
        self.default_pool()?.get_items(keys)
    }

    fn save(&self, item: &CacheItem) -> Result<bool> {
        self.default_pool()?.save(item)
    }

    fn save_deferred(&self, item: CacheItem) -> Result<bool> {
        self.default_pool()?.save_deferred(item)
    }

    fn commit(&self) -> Result<bool> {
        self.default_pool()?.commit()
    }

    fn delete_item(&self, key: &str) -> Result<bool> {
        self.default_pool()?.delete_item(key)
    }

    fn delete_items(&self, keys: &[&str]) -> Result<bool> {
        self.default_pool()?.delete_items(keys)
    }

    fn clear(&self) -> Result<bool> {
        self.default_pool()?.clear()
    }
}
