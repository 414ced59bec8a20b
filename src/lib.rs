//! # Freshkeep
//!
//! Offline-first persistence and derived-state layer for perishable inventory.
//!
//! Freshkeep stores food items, categories and storage locations, keeps
//! working when its structured `SQLite` engine fails by downgrading to a flat
//! key-value store, derives freshness on every read, and fronts everything
//! with a versioned read-through cache.
//!
//! ## Layers
//!
//! - [`storage`]: the [`StorageBackend`] contract, its two implementations,
//!   the [`ConnectionSupervisor`] and the schema/seed manager
//! - [`services`]: repositories, status derivation and the
//!   [`CacheOrchestrator`]
//! - [`models`]: records and derived views
//!
//! ## Example
//!
//! ```rust,ignore
//! use freshkeep::{FreshStore, StoreConfig, ExpiryStatus};
//!
//! let store = FreshStore::open(&StoreConfig::load_default())?;
//! let cache = store.cache();
//! cache.refresh_all()?;
//! for item in cache.get_by_status(ExpiryStatus::ExpiringSoon) {
//!     println!("{} expires in {} days", item.item.name, item.days_until_expiry);
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::StoreConfig;
pub use models::{
    Category, ExpiryStatus, FoodItem, FoodItemDraft, FoodItemWithDetails, Freshness, Language,
    Location, ReferenceDraft, ReferenceKind, ReferenceRecord,
};
pub use services::{
    CacheOrchestrator, CacheStatus, Clock, DashboardCounts, FixedClock, FoodItemRepository,
    FreshStore, ReferenceRepository, SystemClock, classify,
};
pub use storage::{BackendKind, ConnectionSupervisor, Session, StorageBackend, SupervisorState};

/// Error type for freshkeep operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `ConnectionLost` | A backend probe or statement failed |
/// | `BackendUnavailable` | Both the structured engine and the flat store failed |
/// | `ConstraintViolation` | Dangling reference on write, update/delete of a missing row |
/// | `InvalidArgument` | Missing id, blank name |
/// | `NotFound` | Backend-level update/delete matched no row |
/// | `CorruptionDetected` | Reference data dominated by placeholder rows |
/// | `Serialization` | Flat-store blob could not be encoded or decoded |
/// | `Config` | Configuration file unreadable or malformed |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A backend probe or operation failed.
    ///
    /// Absorbed by the connection supervisor while acquiring a session;
    /// surfaced when a statement fails after acquisition.
    #[error("connection lost during '{operation}': {cause}")]
    ConnectionLost {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// No backend could be opened, including the degraded flat store.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A write violated a data constraint.
    ///
    /// Raised when:
    /// - A food item references a category or location that does not exist
    /// - An update or delete targets an id with no matching row
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The caller supplied an invalid argument.
    ///
    /// Raised when:
    /// - Update or delete is called without a valid id
    /// - A name is blank
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A backend update or delete matched no row.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name ("food item", "category", "location").
        entity: &'static str,
        /// The id that was looked up.
        id: i64,
    },

    /// A reference collection consists mostly of placeholder rows.
    #[error(
        "corruption detected in {collection}: {placeholder_rows} of {total_rows} rows are placeholders"
    )]
    CorruptionDetected {
        /// The affected collection.
        collection: &'static str,
        /// Rows carrying sentinel values.
        placeholder_rows: usize,
        /// Rows in the collection.
        total_rows: usize,
    },

    /// A flat-store value could not be serialized or deserialized.
    #[error("serialization of '{key}' failed: {cause}")]
    Serialization {
        /// The key being read or written.
        key: String,
        /// The underlying cause.
        cause: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for failures the connection supervisor may recover from.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }

    pub(crate) fn connection_lost(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::ConnectionLost {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for freshkeep operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidArgument("missing id".to_string());
        assert_eq!(err.to_string(), "invalid argument: missing id");

        let err = Error::connection_lost("probe", "disk I/O error");
        assert_eq!(
            err.to_string(),
            "connection lost during 'probe': disk I/O error"
        );
        assert!(err.is_connection_failure());

        let err = Error::NotFound {
            entity: "food item",
            id: 4,
        };
        assert_eq!(err.to_string(), "food item 4 not found");
        assert!(!err.is_connection_failure());

        let err = Error::CorruptionDetected {
            collection: "categories",
            placeholder_rows: 7,
            total_rows: 8,
        };
        assert_eq!(
            err.to_string(),
            "corruption detected in categories: 7 of 8 rows are placeholders"
        );
    }
}
