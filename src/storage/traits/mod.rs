//! Storage backend traits.

mod backend;
mod key_value;

pub use backend::{BackendKind, StorageBackend};
pub use key_value::KeyValueStore;
