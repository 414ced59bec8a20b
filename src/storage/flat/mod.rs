//! Degraded-mode flat store.
//!
//! Persists each collection as a single JSON array under a fixed key of a
//! [`KeyValueStore`](crate::storage::traits::KeyValueStore).

mod kv;
mod store;

pub use kv::{FileKeyValueStore, MemoryKeyValueStore};
pub use store::{
    CATEGORIES_KEY, FOOD_ITEMS_KEY, FlatStore, INITIALIZED_KEY, LOCATIONS_KEY,
};
