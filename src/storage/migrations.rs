//! Embedded schema migrations for the structured engine.
//!
//! The applied version is tracked in `PRAGMA user_version`. Each pending
//! migration runs inside its own transaction together with the version bump,
//! so a failed migration leaves the previous schema intact.

use crate::storage::sqlite::sql_error;
use crate::Result;
use rusqlite::Connection;

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// Schema for the inventory database.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial inventory tables",
        sql: "
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                icon TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                icon TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS food_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                quantity INTEGER DEFAULT 1,
                category_id INTEGER NULL,
                location_id INTEGER NULL,
                expiry_date TEXT NOT NULL,
                reminder_days INTEGER DEFAULT 0,
                notes TEXT,
                image_uri TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories (id) ON DELETE SET NULL,
                FOREIGN KEY (location_id) REFERENCES locations (id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS app_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        ",
    },
    Migration {
        version: 2,
        description: "Indexes for expiry ordering and reference joins",
        sql: "
            CREATE INDEX IF NOT EXISTS idx_food_items_expiry ON food_items (expiry_date, id);
            CREATE INDEX IF NOT EXISTS idx_food_items_category ON food_items (category_id);
            CREATE INDEX IF NOT EXISTS idx_food_items_location ON food_items (location_id);
        ",
    },
];

/// Tables that must exist once all migrations have been applied.
pub const REQUIRED_TABLES: &[&str] = &["categories", "locations", "food_items", "app_meta"];

/// Maximum version across a set of migrations.
#[must_use]
pub const fn max_version(migrations: &[Migration]) -> i32 {
    let mut max = 0;
    let mut i = 0;
    while i < migrations.len() {
        if migrations[i].version > max {
            max = migrations[i].version;
        }
        i += 1;
    }
    max
}

/// Applies pending migrations to a connection.
pub struct MigrationRunner<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationRunner<'a> {
    /// Creates a runner over an open connection.
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Returns the applied schema version (0 for a fresh database).
    pub fn current_version(&self) -> Result<i32> {
        self.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(sql_error("migration_current_version"))
    }

    /// Runs all pending migrations and returns the resulting version.
    pub fn run(&self, migrations: &[Migration]) -> Result<i32> {
        let mut version = self.current_version()?;
        for migration in migrations {
            if migration.version > version {
                self.apply(migration)?;
                version = migration.version;
            }
        }
        Ok(version)
    }

    fn apply(&self, migration: &Migration) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(sql_error("migration_begin"))?;
        tx.execute_batch(migration.sql)
            .map_err(sql_error("migration_apply"))?;
        tx.pragma_update(None, "user_version", migration.version)
            .map_err(sql_error("migration_record"))?;
        tx.commit().map_err(sql_error("migration_commit"))?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
        Ok(())
    }

    /// Returns the required tables that are missing.
    pub fn missing_tables(&self) -> Result<Vec<&'static str>> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .map_err(sql_error("validate_schema"))?;
        let mut missing = Vec::new();
        for table in REQUIRED_TABLES {
            let exists = stmt.exists([*table]).map_err(sql_error("validate_schema"))?;
            if !exists {
                missing.push(*table);
            }
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_version() {
        assert_eq!(max_version(MIGRATIONS), 2);
        assert_eq!(max_version(&[]), 0);
    }

    #[test]
    fn test_run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new(&conn);
        assert_eq!(runner.current_version().unwrap(), 0);
        assert_eq!(runner.missing_tables().unwrap().len(), REQUIRED_TABLES.len());

        assert_eq!(runner.run(MIGRATIONS).unwrap(), 2);
        assert_eq!(runner.run(MIGRATIONS).unwrap(), 2);
        assert!(runner.missing_tables().unwrap().is_empty());
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new(&conn);
        let broken = [Migration {
            version: 1,
            description: "broken",
            sql: "CREATE TABLE a (id INTEGER); CREATE TABLE a (id INTEGER);",
        }];
        assert!(runner.run(&broken).is_err());
        assert_eq!(runner.current_version().unwrap(), 0);
    }
}
