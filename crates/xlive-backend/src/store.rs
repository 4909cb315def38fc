//! Key-value persistence capability.
//!
//! Values are JSON. [`JsonFileStore`] keeps every key in one JSON object file
//! and rewrites it on each change; [`MemoryStore`] is the in-process variant.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::warn;

use crate::errors::StoreError;

/// Minimal key-value persistence.
pub trait KeyValueStore: Send + Sync {
    /// Value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    /// Insert or replace.
    fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;
    /// Remove; missing keys are fine.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _ = self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _ = self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Store backed by a single JSON object file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Store at `path`; the file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str::<BTreeMap<String, Value>>(&data) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "store file is not a JSON object");
                Err(e.into())
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        let _ = entries.insert(key.to_string(), value);
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self
            .load()?
            .into_keys()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("friends/0").unwrap(), None);
        store.put("friends/0", json!(["0009000000000001"])).unwrap();
        store.put("friends/1", json!([])).unwrap();
        store.put("other", json!(1)).unwrap();
        assert_eq!(
            store.get("friends/0").unwrap(),
            Some(json!(["0009000000000001"]))
        );
        assert_eq!(store.keys("friends/").unwrap(), ["friends/0", "friends/1"]);
        store.remove("friends/0").unwrap();
        store.remove("friends/0").unwrap();
        assert_eq!(store.get("friends/0").unwrap(), None);
    }

    #[test]
    fn memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_creates_parents_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/store.json");
        let store = JsonFileStore::new(&path);
        exercise(&store);

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("friends/1").unwrap(), Some(json!([])));
        assert_eq!(reopened.path(), path);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let store = JsonFileStore::new(&path);
        assert_matches!(store.get("x"), Err(StoreError::Json(_)));
    }
}
