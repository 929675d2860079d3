//! Cache manager for persisting monthly reports to disk
//!
//! Provides a `CacheManager` that stores serializable values as JSON files, one
//! file per key, and can enumerate every key it holds.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extension used for cache entries
const ENTRY_EXTENSION: &str = "json";

/// Errors that can occur while reading or writing the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem access failed
    #[error("Cache I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored text could not be encoded or decoded
    #[error("Cache entry '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key cannot be used as a file name
    #[error("Invalid cache key: '{0}'")]
    InvalidKey(String),
}

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// When the data was cached
    cached_at: DateTime<Utc>,
}

/// Manages reading and writing cached data to disk
///
/// Entries live as `<key>.json` files in an XDG-compliant cache directory
/// (`~/.cache/covidstats/` on Linux). Writes overwrite any prior value and
/// entries never expire.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "covidstats")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory backing this cache
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.cache_dir.join(format!("{}.{}", key, ENTRY_EXTENSION)))
    }

    /// Writes a value under `key`, replacing whatever was stored there
    ///
    /// # Arguments
    /// * `key` - Unique identifier for the cache entry (e.g., "2021-03-01")
    /// * `data` - The data to cache (must implement Serialize)
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if directory creation, serialization, or file writing fails
    pub fn put<T: Serialize>(&self, key: &str, data: &T) -> Result<(), CacheError> {
        let path = self.cache_path(key)?;
        let io_err = |source| CacheError::Io {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.cache_dir).map_err(io_err)?;

        let entry = CacheEntry {
            data,
            cached_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&entry).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;

        fs::write(path, json).map_err(io_err)
    }

    /// Reads the value stored under `key`
    ///
    /// # Returns
    /// * `Ok(Some(data))` if the entry exists and can be parsed
    /// * `Ok(None)` if nothing is stored under the key
    /// * `Err(CacheError::Corrupt)` if the entry exists but cannot be parsed
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        Ok(self.get_entry(key)?.map(|(data, _)| data))
    }

    /// Like [`CacheManager::get`], also returning when the entry was written
    pub fn get_entry<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<(T, DateTime<Utc>)>, CacheError> {
        let path = self.cache_path(key)?;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        let entry: CacheEntry<T> =
            serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })?;

        Ok(Some((entry.data, entry.cached_at)))
    }

    /// Lists every key currently stored, in no particular order
    ///
    /// A cache directory that does not exist yet holds no keys.
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        let io_err = |source| CacheError::Io {
            key: String::new(),
            source,
        };

        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_err(source)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }

        Ok(keys)
    }
}
