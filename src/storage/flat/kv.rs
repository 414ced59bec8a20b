//! Key-value store implementations.

use crate::storage::acquire_lock;
use crate::storage::traits::KeyValueStore;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Maximum size of a single stored value (16MB).
const MAX_VALUE_SIZE: u64 = 16 * 1024 * 1024;

/// File-backed key-value store: one file per key under a base directory.
///
/// Writes go to a temporary file that is renamed over the target, so a crash
/// mid-write leaves the previous value readable.
pub struct FileKeyValueStore {
    base_path: PathBuf,
}

impl FileKeyValueStore {
    /// Creates the store, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLost`] if the directory cannot be created.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| Error::connection_lost("create_kv_dir", e))?;
        Ok(Self { base_path })
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if !Self::is_safe_key(key) {
            return Err(Error::InvalidArgument(format!(
                "key contains invalid characters: {key}"
            )));
        }
        Ok(self.base_path.join(format!("{key}.json")))
    }

    /// Keys may contain alphanumerics, dash, underscore and single dots.
    fn is_safe_key(key: &str) -> bool {
        !key.is_empty()
            && key.len() <= 200
            && !key.starts_with('.')
            && !key.contains("..")
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::connection_lost("read_kv_metadata", e)),
        };
        if metadata.len() > MAX_VALUE_SIZE {
            return Err(Error::Serialization {
                key: key.to_string(),
                cause: format!("value exceeds maximum size of {MAX_VALUE_SIZE} bytes"),
            });
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| Error::connection_lost("read_kv_value", e))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| Error::connection_lost("write_kv_value", e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::connection_lost("rename_kv_value", e))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::connection_lost("remove_kv_value", e)),
        }
    }
}

/// In-memory key-value store (useful for testing).
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(acquire_lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        acquire_lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        acquire_lock(&self.values).remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();

        assert_eq!(store.get("freshkeep.categories").unwrap(), None);
        store.set("freshkeep.categories", "[]").unwrap();
        assert_eq!(store.get("freshkeep.categories").unwrap().as_deref(), Some("[]"));
        store.set("freshkeep.categories", "[1]").unwrap();
        assert_eq!(store.get("freshkeep.categories").unwrap().as_deref(), Some("[1]"));

        store.remove("freshkeep.categories").unwrap();
        store.remove("freshkeep.categories").unwrap();
        assert_eq!(store.get("freshkeep.categories").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();
        for key in ["../escape", "a/b", "", ".hidden", "a..b"] {
            assert!(
                matches!(store.set(key, "x"), Err(Error::InvalidArgument(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        FileKeyValueStore::new(dir.path())
            .unwrap()
            .set("freshkeep.initialized", "en")
            .unwrap();
        let reopened = FileKeyValueStore::new(dir.path()).unwrap();
        assert_eq!(reopened.get("freshkeep.initialized").unwrap().as_deref(), Some("en"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
