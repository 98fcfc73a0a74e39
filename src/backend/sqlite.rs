//! SQLite cache backend.

use super::CacheBackend;
use crate::error::{Error, Result};
use crate::item::CacheItem;
use crate::serialization::{decode_item, encode_item};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_TABLE: &str = "cache_items";
pub const DEFAULT_KEY_COLUMN: &str = "item_key";
pub const DEFAULT_VALUE_COLUMN: &str = "item_value";

/// Table layout for [`SqliteBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqliteOptions {
    pub table: String,
    pub key_column: String,
    pub value_column: String,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        SqliteOptions {
            table: DEFAULT_TABLE.to_string(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
        }
    }
}

impl SqliteOptions {
    /// Table and column names are interpolated into SQL, so only plain
    /// identifiers are accepted.
    fn validate(&self) -> Result<()> {
        for ident in [&self.table, &self.key_column, &self.value_column] {
            if !is_identifier(ident) {
                return Err(Error::invalid_arguments(
                    "sqlite",
                    format!("\"{}\" is not a valid SQL identifier", ident),
                ));
            }
        }
        if self.key_column == self.value_column {
            return Err(Error::invalid_arguments(
                "sqlite",
                "key and value columns must differ",
            ));
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Backend storing items in a two-column SQLite table keyed by the raw key.
///
/// # Example
///
/// ```
/// # use pool_cache::backend::{CacheBackend, SqliteBackend};
/// # use pool_cache::{CacheItem, Ttl};
/// # fn example() -> pool_cache::Result<()> {
/// let backend = SqliteBackend::memory()?;
/// let item = CacheItem::with_ttl("key", b"value".to_vec(), Some(Ttl::Seconds(60)))?;
/// assert!(backend.persist(&item));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    select_sql: String,
    delete_sql: String,
    insert_sql: String,
    clear_sql: String,
}

impl SqliteBackend {
    /// Open a file-backed database with the default table layout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(Some(path.as_ref()), SqliteOptions::default())
    }

    /// Create an in-memory database with the default table layout.
    pub fn memory() -> Result<Self> {
        Self::with_options(None, SqliteOptions::default())
    }

    /// Open `path` (or an in-memory database for `None`) with a custom table
    /// layout. The table is created when missing.
    ///
    /// # Errors
    /// - `Error::InvalidArguments` for table/column names that are not plain
    ///   identifiers
    /// - `Error::BackendError` when the database cannot be opened or the
    ///   table cannot be created
    pub fn with_options(path: Option<&Path>, options: SqliteOptions) -> Result<Self> {
        options.validate()?;

        let conn = match path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(|e| Error::BackendError(format!("Unable to open sqlite database: {}", e)))?;

        let SqliteOptions {
            table,
            key_column,
            value_column,
        } = options;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                {key_column} TEXT PRIMARY KEY NOT NULL,
                {value_column} BLOB NOT NULL
            );"
        ))
        .map_err(|e| Error::BackendError(format!("Unable to create table {}: {}", table, e)))?;

        info!(
            "✓ SQLite backend initialized ({}, table: {})",
            path.map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string()),
            table
        );

        Ok(SqliteBackend {
            conn: Mutex::new(conn),
            select_sql: format!("SELECT {value_column} FROM {table} WHERE {key_column} = ?1 LIMIT 1"),
            delete_sql: format!("DELETE FROM {table} WHERE {key_column} = ?1"),
            insert_sql: format!("INSERT INTO {table} ({key_column}, {value_column}) VALUES (?1, ?2)"),
            clear_sql: format!("DELETE FROM {table}"),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, key: &str, bytes: &[u8]) -> rusqlite::Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(&self.delete_sql, params![key])?;
        tx.execute(&self.insert_sql, params![key, bytes])?;
        tx.commit()
    }

    fn reap(&self, key: &str) -> rusqlite::Result<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let bytes: Option<Vec<u8>> = tx
            .query_row(&self.select_sql, params![key], |row| row.get(0))
            .optional()?;

        let expired = bytes
            .and_then(|bytes| decode_item(key, &bytes).ok())
            .is_some_and(|item| !item.is_hit());
        if !expired {
            return Ok(false);
        }

        let affected = tx.execute(&self.delete_sql, params![key])?;
        tx.commit()?;
        Ok(affected > 0)
    }
}

impl CacheBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn fetch(&self, key: &str) -> Result<Option<CacheItem>> {
        let row: rusqlite::Result<Option<Vec<u8>>> = self
            .lock()
            .query_row(&self.select_sql, params![key], |row| row.get(0))
            .optional();

        match row {
            Ok(Some(bytes)) => decode_item(key, &bytes).map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("SQLite SELECT failed for key {}: {}", key, e);
                Ok(None)
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.lock().execute(&self.delete_sql, params![key]) {
            Ok(affected) => affected > 0,
            Err(e) => {
                warn!("SQLite DELETE failed for key {}: {}", key, e);
                false
            }
        }
    }

    fn persist(&self, item: &CacheItem) -> bool {
        let bytes = match encode_item(item) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("SQLite backend failed to encode {}: {}", item.key(), e);
                return false;
            }
        };

        match self.replace(item.key(), &bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!("SQLite INSERT failed for key {}: {}", item.key(), e);
                false
            }
        }
    }

    fn remove_expired(&self, key: &str) -> bool {
        match self.reap(key) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("SQLite reap failed for key {}: {}", key, e);
                false
            }
        }
    }

    fn clear(&self) -> bool {
        match self.lock().execute(&self.clear_sql, []) {
            Ok(_) => {
                warn!("⚠ SQLite cache table cleared");
                true
            }
            Err(e) => {
                warn!("SQLite clear failed: {}", e);
                false
            }
        }
    }
}
