//! `SQLite`-backed structured engine.

use super::connection::{acquire_lock, configure_connection, sql_error};
use super::metrics::{record_operation_metrics, status_label};
use super::rows::{FOOD_ITEM_COLUMNS, FoodItemRow, format_date, reference_from_row};
use crate::models::{
    FoodItem, FoodItemDraft, Language, ReferenceDraft, ReferenceKind, ReferenceRecord,
};
use crate::storage::migrations::{MIGRATIONS, MigrationRunner};
use crate::storage::traits::{BackendKind, StorageBackend};
use crate::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "structured";
const INITIALIZED_KEY: &str = "initialized";

/// Structured engine over a single `SQLite` database.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` because `rusqlite::Connection` is not `Sync`.
/// Every statement is a single-statement write or a read; there is no
/// cross-table transaction outside of schema migrations and reset.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
    /// Path to the database file (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteEngine {
    /// Opens (or creates) the database file at `db_path`.
    ///
    /// The schema is not touched; call [`StorageBackend::ensure_schema`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLost`] if the file cannot be opened.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::connection_lost("create_data_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(sql_error("open_sqlite"))?;
        configure_connection(&conn)?;
        tracing::debug!(path = %db_path.display(), "Opened SQLite engine");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        })
    }

    /// Opens an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLost`] if `SQLite` cannot allocate it.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sql_error("open_sqlite_in_memory"))?;
        configure_connection(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs `call` against the connection, recording metrics.
    fn run<T>(&self, operation: &'static str, call: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            call(&conn)
        };
        record_operation_metrics(BACKEND, operation, start, status_label(&result));
        result
    }
}

fn not_found(entity: &'static str, id: i64, changed: usize) -> Result<()> {
    if changed == 0 {
        Err(Error::NotFound { entity, id })
    } else {
        Ok(())
    }
}

impl StorageBackend for SqliteEngine {
    fn kind(&self) -> BackendKind {
        BackendKind::Structured
    }

    #[instrument(skip(self), fields(operation = "probe", backend = BACKEND))]
    fn probe(&self) -> Result<()> {
        self.run("probe", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(sql_error("probe"))?;
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "ensure_schema", backend = BACKEND))]
    fn ensure_schema(&self) -> Result<()> {
        self.run("ensure_schema", |conn| {
            let runner = MigrationRunner::new(conn);
            runner.run(MIGRATIONS)?;
            let missing = runner.missing_tables()?;
            if missing.is_empty() {
                Ok(())
            } else {
                Err(Error::connection_lost(
                    "validate_schema",
                    format!("missing tables: {}", missing.join(", ")),
                ))
            }
        })
    }

    fn seeded_language(&self) -> Result<Option<Language>> {
        self.run("seeded_language", |conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM app_meta WHERE key = ?1",
                    params![INITIALIZED_KEY],
                    |row| row.get(0),
                )
                .optional()
                .map_err(sql_error("seeded_language"))?;
            // Databases seeded before the language was recorded hold "true".
            Ok(value.map(|v| Language::parse(&v).unwrap_or_default()))
        })
    }

    fn mark_initialized(&self, language: Language) -> Result<()> {
        self.run("mark_initialized", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO app_meta (key, value) VALUES (?1, ?2)",
                params![INITIALIZED_KEY, language.as_str()],
            )
            .map_err(sql_error("mark_initialized"))?;
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "reset", backend = BACKEND))]
    fn reset(&self) -> Result<()> {
        self.run("reset", |conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(sql_error("reset_begin"))?;
            tx.execute_batch(
                "DELETE FROM food_items;
                 DELETE FROM categories;
                 DELETE FROM locations;
                 DELETE FROM app_meta;
                 DELETE FROM sqlite_sequence
                   WHERE name IN ('food_items', 'categories', 'locations');",
            )
            .map_err(sql_error("reset"))?;
            tx.commit().map_err(sql_error("reset_commit"))
        })
    }

    #[instrument(skip(self), fields(operation = "list_references", backend = BACKEND))]
    fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceRecord>> {
        self.run("list_references", |conn| {
            let sql = format!("SELECT id, name, icon FROM {} ORDER BY id", kind.table());
            let mut stmt = conn.prepare(&sql).map_err(sql_error("list_references"))?;
            let rows = stmt
                .query_map([], reference_from_row)
                .map_err(sql_error("list_references"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sql_error("list_references"))
        })
    }

    fn get_reference(&self, kind: ReferenceKind, id: i64) -> Result<Option<ReferenceRecord>> {
        self.run("get_reference", |conn| {
            let sql = format!("SELECT id, name, icon FROM {} WHERE id = ?1", kind.table());
            conn.query_row(&sql, params![id], reference_from_row)
                .optional()
                .map_err(sql_error("get_reference"))
        })
    }

    #[instrument(skip(self, draft), fields(operation = "create_reference", backend = BACKEND))]
    fn create_reference(&self, kind: ReferenceKind, draft: &ReferenceDraft) -> Result<i64> {
        self.run("create_reference", |conn| {
            let sql = format!("INSERT INTO {} (name, icon) VALUES (?1, ?2)", kind.table());
            conn.execute(&sql, params![draft.name, draft.icon])
                .map_err(sql_error("create_reference"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn put_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()> {
        self.run("put_reference", |conn| {
            let sql = format!(
                "INSERT OR REPLACE INTO {} (id, name, icon) VALUES (?1, ?2, ?3)",
                kind.table()
            );
            conn.execute(&sql, params![record.id, record.name, record.icon])
                .map_err(sql_error("put_reference"))?;
            Ok(())
        })
    }

    #[instrument(skip(self, record), fields(operation = "update_reference", backend = BACKEND, id = record.id))]
    fn update_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()> {
        self.run("update_reference", |conn| {
            let sql = format!("UPDATE {} SET name = ?1, icon = ?2 WHERE id = ?3", kind.table());
            let changed = conn
                .execute(&sql, params![record.name, record.icon, record.id])
                .map_err(sql_error("update_reference"))?;
            not_found(kind.as_str(), record.id, changed)
        })
    }

    #[instrument(skip(self), fields(operation = "delete_reference", backend = BACKEND))]
    fn delete_reference(&self, kind: ReferenceKind, id: i64) -> Result<()> {
        self.run("delete_reference", |conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
            let changed = conn
                .execute(&sql, params![id])
                .map_err(sql_error("delete_reference"))?;
            not_found(kind.as_str(), id, changed)
        })
    }

    #[instrument(skip(self), fields(operation = "list_food_items", backend = BACKEND))]
    fn list_food_items(&self) -> Result<Vec<FoodItem>> {
        self.run("list_food_items", |conn| {
            let sql =
                format!("SELECT {FOOD_ITEM_COLUMNS} FROM food_items ORDER BY expiry_date, id");
            let mut stmt = conn.prepare(&sql).map_err(sql_error("list_food_items"))?;
            let rows = stmt
                .query_map([], FoodItemRow::from_row)
                .map_err(sql_error("list_food_items"))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sql_error("list_food_items"))?;
            rows.into_iter().map(FoodItemRow::into_item).collect()
        })
    }

    fn get_food_item(&self, id: i64) -> Result<Option<FoodItem>> {
        self.run("get_food_item", |conn| {
            let sql = format!("SELECT {FOOD_ITEM_COLUMNS} FROM food_items WHERE id = ?1");
            conn.query_row(&sql, params![id], FoodItemRow::from_row)
                .optional()
                .map_err(sql_error("get_food_item"))?
                .map(FoodItemRow::into_item)
                .transpose()
        })
    }

    #[instrument(skip(self, draft), fields(operation = "create_food_item", backend = BACKEND))]
    fn create_food_item(&self, draft: &FoodItemDraft, created_at: NaiveDate) -> Result<i64> {
        self.run("create_food_item", |conn| {
            conn.execute(
                "INSERT INTO food_items (name, quantity, category_id, location_id, expiry_date,
                                         reminder_days, notes, image_uri, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    draft.name,
                    draft.quantity,
                    draft.category_id,
                    draft.location_id,
                    format_date(draft.expiry_date),
                    draft.reminder_days,
                    draft.notes,
                    draft.image_uri,
                    format_date(created_at),
                ],
            )
            .map_err(sql_error("create_food_item"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    #[instrument(skip(self, item), fields(operation = "update_food_item", backend = BACKEND, id = item.id))]
    fn update_food_item(&self, item: &FoodItem) -> Result<()> {
        self.run("update_food_item", |conn| {
            let changed = conn
                .execute(
                    "UPDATE food_items
                     SET name = ?1, quantity = ?2, category_id = ?3, location_id = ?4,
                         expiry_date = ?5, reminder_days = ?6, notes = ?7, image_uri = ?8
                     WHERE id = ?9",
                    params![
                        item.name,
                        item.quantity,
                        item.category_id,
                        item.location_id,
                        format_date(item.expiry_date),
                        item.reminder_days,
                        item.notes,
                        item.image_uri,
                        item.id,
                    ],
                )
                .map_err(sql_error("update_food_item"))?;
            not_found("food item", item.id, changed)
        })
    }

    #[instrument(skip(self), fields(operation = "delete_food_item", backend = BACKEND))]
    fn delete_food_item(&self, id: i64) -> Result<()> {
        self.run("delete_food_item", |conn| {
            let changed = conn
                .execute("DELETE FROM food_items WHERE id = ?1", params![id])
                .map_err(sql_error("delete_food_item"))?;
            not_found("food item", id, changed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SqliteEngine {
        let engine = SqliteEngine::in_memory().unwrap();
        engine.ensure_schema().unwrap();
        engine
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_probe_and_schema() {
        let engine = engine();
        engine.probe().unwrap();
        engine.ensure_schema().unwrap();
        assert!(!engine.is_initialized().unwrap());
        assert!(engine.db_path().is_none());
    }

    #[test]
    fn test_food_item_crud() {
        let engine = engine();
        let draft = FoodItemDraft::new("Milk", date(2024, 1, 5))
            .with_category(3)
            .with_notes("semi-skimmed");
        let id = engine.create_food_item(&draft, date(2024, 1, 1)).unwrap();

        let mut item = engine.get_food_item(id).unwrap().unwrap();
        assert_eq!(item.to_draft(), draft);
        assert_eq!(item.created_at, date(2024, 1, 1));

        item.quantity = 3;
        engine.update_food_item(&item).unwrap();
        assert_eq!(engine.get_food_item(id).unwrap().unwrap().quantity, 3);

        engine.delete_food_item(id).unwrap();
        assert!(engine.get_food_item(id).unwrap().is_none());
        assert!(matches!(
            engine.delete_food_item(id),
            Err(Error::NotFound { entity: "food item", .. })
        ));
    }

    #[test]
    fn test_food_items_ordered_by_expiry() {
        let engine = engine();
        let created = date(2024, 1, 1);
        engine
            .create_food_item(&FoodItemDraft::new("Late", date(2024, 3, 1)), created)
            .unwrap();
        engine
            .create_food_item(&FoodItemDraft::new("Early", date(2024, 2, 1)), created)
            .unwrap();
        let names: Vec<_> = engine
            .list_food_items()
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Early", "Late"]);
    }

    #[test]
    fn test_reference_id_spaces_are_disjoint() {
        let engine = engine();
        let cat = engine
            .create_reference(ReferenceKind::Category, &ReferenceDraft::new("Dairy", "cheese"))
            .unwrap();
        let loc = engine
            .create_reference(ReferenceKind::Location, &ReferenceDraft::new("Fridge", "fridge"))
            .unwrap();
        assert_eq!(cat, 1);
        assert_eq!(loc, 1);
        assert_eq!(engine.list_references(ReferenceKind::Category).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_reference_leaves_food_items() {
        let engine = engine();
        let cat = engine
            .create_reference(ReferenceKind::Category, &ReferenceDraft::new("Dairy", "cheese"))
            .unwrap();
        let id = engine
            .create_food_item(
                &FoodItemDraft::new("Milk", date(2024, 1, 5)).with_category(cat),
                date(2024, 1, 1),
            )
            .unwrap();
        engine.delete_reference(ReferenceKind::Category, cat).unwrap();
        assert_eq!(engine.get_food_item(id).unwrap().unwrap().category_id, Some(cat));
    }

    #[test]
    fn test_reset_restarts_ids() {
        let engine = engine();
        engine
            .put_reference(ReferenceKind::Location, &ReferenceRecord::new(1, "Fridge", "fridge"))
            .unwrap();
        engine
            .create_reference(ReferenceKind::Location, &ReferenceDraft::new("Shed", "home"))
            .unwrap();
        engine.mark_initialized(Language::Es).unwrap();
        assert_eq!(engine.seeded_language().unwrap(), Some(Language::Es));

        engine.reset().unwrap();
        assert!(!engine.is_initialized().unwrap());
        assert!(engine.list_references(ReferenceKind::Location).unwrap().is_empty());
        let id = engine
            .create_reference(ReferenceKind::Location, &ReferenceDraft::new("Shed", "home"))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("freshkeep.db");
        let engine = SqliteEngine::open(&path).unwrap();
        engine.ensure_schema().unwrap();
        assert_eq!(engine.db_path(), Some(path.as_path()));
        assert!(path.exists());
    }
}
