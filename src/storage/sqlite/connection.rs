//! Connection handling for the `SQLite` engine.
//!
//! Provides mutex acquisition with poison recovery, pragma configuration and
//! the mapping from `rusqlite` errors onto the crate's error taxonomy.

use crate::Error;
use rusqlite::{Connection, ErrorCode};
use std::sync::{Mutex, MutexGuard};

/// Busy timeout applied to every connection, in milliseconds.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (due to a panic in a previous critical section),
/// the inner value is recovered and a warning is logged.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection.
///
/// - **WAL mode** for file databases (in-memory databases report `memory`)
/// - **NORMAL synchronous**
/// - **`busy_timeout`** of [`BUSY_TIMEOUT_MS`]
/// - **`foreign_keys` off**: deleting a category or location leaves food item
///   references dangling instead of rewriting them
///
/// # Errors
///
/// Returns [`Error::ConnectionLost`] if the connection rejects the
/// configuration outright.
pub fn configure_connection(conn: &Connection) -> crate::Result<()> {
    // journal_mode returns a row, so pragma_update may report an error on some
    // platforms even though the mode was applied.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)
        .map_err(sql_error("configure_connection"))?;
    conn.pragma_update(None, "foreign_keys", "OFF")
        .map_err(sql_error("configure_connection"))?;
    Ok(())
}

/// Returns a mapper from `rusqlite` errors to [`Error`] for `operation`.
///
/// Constraint failures become [`Error::ConstraintViolation`]; everything else
/// is treated as a lost connection so the supervisor can recover.
pub fn sql_error(operation: &'static str) -> impl Fn(rusqlite::Error) -> Error {
    move |e| match e {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::ConstraintViolation(format!("{operation}: {e}"))
        },
        other => Error::connection_lost(operation, other),
    }
}
