//! Key-value persistence.
//!
//! Everything LLM Navigator keeps between runs (analysis history, cached
//! provider answers) goes through the [`KeyValueStore`] trait, so callers
//! never reach for a global store directly.
//!
//! Eviction is explicit per implementation:
//! - [`MemoryStore`] can be bounded; the oldest inserted key is evicted first.
//! - [`FileStore`] never evicts. It grows with every saved analysis and cached
//!   answer until entries are deleted.

pub mod history;

pub use history::AnalysisRepository;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised by stores and repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed store data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous id prefix '{0}'")]
    Ambiguous(String),

    #[error("not allowed: {0}")]
    Forbidden(String),
}

/// A string key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove a key. Returns whether it existed.
    fn delete(&mut self, key: &str) -> Result<bool, StoreError>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw)
    }
}

/// In-memory store with optional capacity.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    capacity: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that keeps at most `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        if self.entries.insert(key.to_string(), value).is_none() {
            self.order.push_back(key.to_string());

            if let Some(capacity) = self.capacity {
                while self.entries.len() > capacity {
                    match self.order.pop_front() {
                        Some(oldest) => {
                            debug!("Evicting {}", oldest);
                            self.entries.remove(&oldest);
                        }
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool, StoreError> {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.order.retain(|k| k != key);
        }
        Ok(existed)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Store persisted as a single JSON document.
///
/// Every write rewrites the whole file through a temporary file in the same
/// directory followed by a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened store {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let content = serde_json::to_string_pretty(&self.entries)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(content.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn delete(&mut self, key: &str) -> Result<bool, StoreError> {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_basic() {
        let mut store = MemoryStore::new();
        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_evicts_oldest() {
        let mut store = MemoryStore::with_capacity(2);
        store.set("first", "1".to_string()).unwrap();
        store.set("second", "2".to_string()).unwrap();
        // Overwriting does not refresh insertion order.
        store.set("first", "1b".to_string()).unwrap();
        store.set("third", "3".to_string()).unwrap();

        assert_eq!(store.get("first").unwrap(), None);
        assert_eq!(store.get("second").unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("third").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_keys_by_prefix() {
        let mut store = MemoryStore::new();
        store.set("analysis:2", "x".to_string()).unwrap();
        store.set("analysis:1", "x".to_string()).unwrap();
        store.set("response:1", "x".to_string()).unwrap();

        assert_eq!(
            store.keys("analysis:").unwrap(),
            vec!["analysis:1", "analysis:2"]
        );
    }

    #[test]
    fn test_json_helpers() {
        let mut store = MemoryStore::new();
        store.set_json("nums", &vec![1, 2, 3]).unwrap();
        let nums: Option<Vec<i32>> = store.get_json("nums").unwrap();
        assert_eq!(nums, Some(vec![1, 2, 3]));

        store.set("bad", "{not json".to_string()).unwrap();
        assert!(store.get_json::<Vec<i32>>("bad").is_err());
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let mut store = FileStore::open(&path).unwrap();
            store.set("analysis:1", "one".to_string()).unwrap();
            store.set("analysis:2", "two".to_string()).unwrap();
            store.set("other", "x".to_string()).unwrap();
            store.delete("analysis:2").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("analysis:1").unwrap().as_deref(), Some("one"));
        assert_eq!(store.keys("analysis:").unwrap(), vec!["analysis:1"]);
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Serialization(_))
        ));
    }
}
