// SPDX-License-Identifier: MIT OR Apache-2.0
//! Durable key/value store backed by one JSON file.
//!
//! Every key holds an arbitrary JSON value. Writes go through to disk
//! immediately; a failed write is logged and the in-memory value kept, so the
//! session keeps working on a read-only disk.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key holding the task list
pub const TASKS_KEY: &str = "bubbles-tasks";

/// Key holding the task → colour map
pub const COLORS_KEY: &str = "bubbles-colors";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// JSON file key/value store
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing or unreadable file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read(&path) {
            Ok(Some(values)) => {
                tracing::info!("Loaded {} keys from {:?}", values.len(), path);
                values
            }
            Ok(None) => {
                tracing::info!("No store at {:?}, starting empty", path);
                Map::new()
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable store {:?}: {}", path, e);
                Map::new()
            }
        };

        Self { path, values }
    }

    fn read(path: &Path) -> Result<Option<Map<String, Value>>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Read and decode a value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Stored value for '{}' has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Store a value and write the file
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.values.insert(key.to_string(), value);
                self.persist();
            }
            Err(e) => tracing::warn!("Failed to encode '{}': {}", key, e),
        }
    }

    /// Drop a key and write the file
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.values.remove(key).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// File backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to write store {:?}: {}", self.path, e);
        }
    }

    /// Write all values to disk, replacing the file atomically
    pub fn flush(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("bubbledo-store-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let store = JsonFileStore::open(temp_path());
        assert!(!store.contains(TASKS_KEY));
        assert_eq!(store.get::<Vec<String>>(TASKS_KEY), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let path = temp_path();
        let mut store = JsonFileStore::open(&path);
        let mut colors = HashMap::new();
        colors.insert("a".to_string(), "#f87171".to_string());
        store.set(COLORS_KEY, &colors);

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get::<HashMap<String, String>>(COLORS_KEY), Some(colors));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path();
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert!(!store.contains(TASKS_KEY));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_wrong_shape_reads_as_none() {
        let path = temp_path();
        let mut store = JsonFileStore::open(&path);
        store.set(TASKS_KEY, &"not a list");
        assert_eq!(store.get::<Vec<String>>(TASKS_KEY), None);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_remove_key() {
        let path = temp_path();
        let mut store = JsonFileStore::open(&path);
        store.set(TASKS_KEY, &vec![1, 2, 3]);
        assert!(store.remove(TASKS_KEY));
        assert!(!store.remove(TASKS_KEY));
        assert!(!JsonFileStore::open(&path).contains(TASKS_KEY));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_failed_write_keeps_memory_value() {
        let path = std::env::temp_dir()
            .join(format!("bubbledo-missing-{}", uuid::Uuid::new_v4()))
            .join("store.json");
        let mut store = JsonFileStore::open(&path);
        store.set(TASKS_KEY, &vec!["kept".to_string()]);
        assert!(store.flush().is_err());
        assert_eq!(store.get::<Vec<String>>(TASKS_KEY), Some(vec!["kept".to_string()]));
    }
}
