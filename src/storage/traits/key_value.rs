//! Key-value persistence used by the flat store.

use crate::Result;

/// Process-wide string key-value persistence.
///
/// Values are opaque strings; the flat store keeps one JSON blob per
/// collection under a fixed key.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a value. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
