//! `SQLite` structured engine.
//!
//! ## Module Structure
//!
//! - [`connection`]: lock acquisition, pragma configuration, error mapping
//! - [`metrics`]: shared metrics recording, also used by the flat store
//! - [`engine`]: the [`SqliteEngine`] backend
//! - [`rows`]: row conversion for food items and reference rows

mod connection;
mod engine;
mod metrics;
mod rows;

pub use connection::{BUSY_TIMEOUT_MS, acquire_lock, configure_connection, sql_error};
pub use engine::SqliteEngine;
pub use metrics::{record_operation_metrics, status_label};
