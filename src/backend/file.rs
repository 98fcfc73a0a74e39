//! Filesystem cache backend.

use super::CacheBackend;
use crate::error::{Error, Result};
use crate::item::CacheItem;
use crate::serialization::{decode_item, encode_item};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory name used under the system temp dir when none is configured.
pub const DEFAULT_DIRECTORY_NAME: &str = "pool-cache";

/// Backend storing one file per item inside a directory.
///
/// File names are the hex SHA-256 of the key; contents are the versioned
/// envelope from [`crate::serialization`].
///
/// # Example
///
/// ```no_run
/// # use pool_cache::backend::FileBackend;
/// # fn example() -> pool_cache::Result<()> {
/// let backend = FileBackend::new(Some("/var/cache/myapp".into()))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct FileBackend {
    directory: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) the cache directory.
    ///
    /// `None` selects `<temp_dir>/pool-cache`.
    ///
    /// # Errors
    /// `Error::InvalidDirectory` if the directory cannot be created, is not a
    /// directory or this process cannot create files in it.
    pub fn new(directory: Option<PathBuf>) -> Result<Self> {
        let directory =
            directory.unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DIRECTORY_NAME));

        if !directory.is_dir() {
            fs::create_dir_all(&directory).map_err(|e| {
                warn!(
                    "Failed to create cache directory {}: {}",
                    directory.display(),
                    e
                );
                Error::InvalidDirectory(directory.clone())
            })?;
        }

        let metadata =
            fs::metadata(&directory).map_err(|_| Error::InvalidDirectory(directory.clone()))?;
        if !metadata.is_dir() {
            return Err(Error::InvalidDirectory(directory));
        }

        // permission bits alone don't say whether this process may write here
        if let Err(e) = tempfile::tempfile_in(&directory) {
            warn!(
                "Cache directory {} is not writable: {}",
                directory.display(),
                e
            );
            return Err(Error::InvalidDirectory(directory));
        }

        info!("✓ File backend initialized at {}", directory.display());
        Ok(FileBackend { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.directory.join(hex::encode(digest))
    }

    /// Write to a uniquely named temp file in the cache directory, then
    /// rename it over `path`. Concurrent writers of one key never share a
    /// temp file; the last rename wins.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.directory)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map(|_| ()).map_err(|e| e.error)
    }
}

fn empty_directory(directory: &Path) -> io::Result<()> {
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

impl CacheBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn fetch(&self, key: &str) -> Result<Option<CacheItem>> {
        let path = self.path_for(key);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!("File backend failed to read {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        match decode_item(key, &bytes) {
            Ok(item) => Ok(Some(item)),
            Err(e) => {
                // unreadable, drop it
                let _ = fs::remove_file(&path);
                Err(e)
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("File backend failed to remove {}: {}", path.display(), e);
                false
            }
        }
    }

    fn persist(&self, item: &CacheItem) -> bool {
        let bytes = match encode_item(item) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("File backend failed to encode {}: {}", item.key(), e);
                return false;
            }
        };

        let path = self.path_for(item.key());
        match self.write_atomic(&path, &bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!("File backend failed to write {}: {}", path.display(), e);
                false
            }
        }
    }

    fn clear(&self) -> bool {
        match empty_directory(&self.directory) {
            Ok(()) => {
                warn!(
                    "⚠ File backend cleared all entries in {}",
                    self.directory.display()
                );
                true
            }
            Err(e) => {
                warn!(
                    "File backend failed to clear {}: {}",
                    self.directory.display(),
                    e
                );
                false
            }
        }
    }
}
