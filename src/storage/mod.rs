//! Storage layer.
//!
//! Two interchangeable backends implement [`StorageBackend`]:
//! - **Structured**: `SQLite` with foreign keys declared, migrations and indexes
//! - **Flat**: JSON blobs in a key-value store, used when the structured
//!   engine cannot be opened or recovered
//!
//! The [`ConnectionSupervisor`] decides which one is live.

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]
// Allow match_same_arms for explicit enum handling.
#![allow(clippy::match_same_arms)]

pub mod flat;
pub mod migrations;
pub mod schema;
pub mod seeds;
pub mod sqlite;
pub mod supervisor;
pub mod traits;

pub use flat::{FileKeyValueStore, FlatStore, MemoryKeyValueStore};
pub use schema::{InitOutcome, SchemaManager};
pub use seeds::SeedSet;
pub use sqlite::{SqliteEngine, acquire_lock};
pub use supervisor::{
    BackendOpener, ConnectionSupervisor, DEFAULT_DATABASE_NAME, DefaultOpener, EphemeralOpener,
    Session, SupervisorState,
};
pub use traits::{BackendKind, KeyValueStore, StorageBackend};
