//! Flat store backend.

use crate::models::{
    FoodItem, FoodItemDraft, Language, ReferenceDraft, ReferenceKind, ReferenceRecord,
};
use crate::storage::acquire_lock;
use crate::storage::sqlite::{record_operation_metrics, status_label};
use crate::storage::traits::{BackendKind, KeyValueStore, StorageBackend};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::instrument;

/// Key holding the category array.
pub const CATEGORIES_KEY: &str = "freshkeep.categories";
/// Key holding the location array.
pub const LOCATIONS_KEY: &str = "freshkeep.locations";
/// Key holding the food item array.
pub const FOOD_ITEMS_KEY: &str = "freshkeep.food_items";
/// Key guarding re-seeding; holds the language defaults were seeded in.
pub const INITIALIZED_KEY: &str = "freshkeep.initialized";

const PROBE_KEY: &str = "freshkeep.probe";
const BACKEND: &str = "flat";

/// Schemaless backend storing each collection as one JSON blob.
///
/// Ids are allocated from a per-collection high-water mark kept next to the
/// collection (`<key>.seq`), so ids of deleted rows are never reused.
/// Read-modify-write cycles are serialized by an internal lock.
pub struct FlatStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl FlatStore {
    /// Creates a flat store over a key-value store.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    const fn reference_key(kind: ReferenceKind) -> &'static str {
        match kind {
            ReferenceKind::Category => CATEGORIES_KEY,
            ReferenceKind::Location => LOCATIONS_KEY,
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.kv.get(key)? {
            None => Ok(Vec::new()),
            Some(blob) => serde_json::from_str(&blob).map_err(|e| Error::Serialization {
                key: key.to_string(),
                cause: e.to_string(),
            }),
        }
    }

    fn save<T: Serialize>(&self, key: &str, rows: &[T]) -> Result<()> {
        let blob = serde_json::to_string(rows).map_err(|e| Error::Serialization {
            key: key.to_string(),
            cause: e.to_string(),
        })?;
        self.kv.set(key, &blob)
    }

    /// Allocates the next id for `key`, given the ids currently stored.
    fn next_id(&self, key: &str, max_existing: i64) -> Result<i64> {
        let seq_key = format!("{key}.seq");
        let stored = self
            .kv
            .get(&seq_key)?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let id = stored.max(max_existing) + 1;
        self.kv.set(&seq_key, &id.to_string())?;
        Ok(id)
    }

    /// Raises the high-water mark so explicitly placed ids are not reissued.
    fn bump_sequence(&self, key: &str, id: i64) -> Result<()> {
        let seq_key = format!("{key}.seq");
        let stored = self
            .kv
            .get(&seq_key)?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);
        if id > stored {
            self.kv.set(&seq_key, &id.to_string())?;
        }
        Ok(())
    }

    fn timed<T>(&self, operation: &'static str, call: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = call();
        record_operation_metrics(BACKEND, operation, start, status_label(&result));
        result
    }
}

impl StorageBackend for FlatStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    #[instrument(skip(self), fields(operation = "probe", backend = BACKEND))]
    fn probe(&self) -> Result<()> {
        self.timed("probe", || {
            self.kv.set(PROBE_KEY, "ok")?;
            match self.kv.get(PROBE_KEY)?.as_deref() {
                Some("ok") => Ok(()),
                other => Err(Error::connection_lost(
                    "probe",
                    format!("probe key read back {other:?}"),
                )),
            }
        })
    }

    fn ensure_schema(&self) -> Result<()> {
        // Schemaless; only verify every collection decodes.
        self.timed("ensure_schema", || {
            self.load::<ReferenceRecord>(CATEGORIES_KEY)?;
            self.load::<ReferenceRecord>(LOCATIONS_KEY)?;
            self.load::<FoodItem>(FOOD_ITEMS_KEY)?;
            Ok(())
        })
    }

    fn seeded_language(&self) -> Result<Option<Language>> {
        Ok(self
            .kv
            .get(INITIALIZED_KEY)?
            .map(|v| Language::parse(&v).unwrap_or_default()))
    }

    fn mark_initialized(&self, language: Language) -> Result<()> {
        self.kv.set(INITIALIZED_KEY, language.as_str())
    }

    #[instrument(skip(self), fields(operation = "reset", backend = BACKEND))]
    fn reset(&self) -> Result<()> {
        self.timed("reset", || {
            let _guard = acquire_lock(&self.write_lock);
            for key in [CATEGORIES_KEY, LOCATIONS_KEY, FOOD_ITEMS_KEY] {
                self.kv.remove(key)?;
                self.kv.remove(&format!("{key}.seq"))?;
            }
            self.kv.remove(INITIALIZED_KEY)
        })
    }

    fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceRecord>> {
        self.timed("list_references", || {
            let mut rows: Vec<ReferenceRecord> = self.load(Self::reference_key(kind))?;
            rows.sort_by_key(|r| r.id);
            Ok(rows)
        })
    }

    fn get_reference(&self, kind: ReferenceKind, id: i64) -> Result<Option<ReferenceRecord>> {
        self.timed("get_reference", || {
            let rows: Vec<ReferenceRecord> = self.load(Self::reference_key(kind))?;
            Ok(rows.into_iter().find(|r| r.id == id))
        })
    }

    #[instrument(skip(self, draft), fields(operation = "create_reference", backend = BACKEND))]
    fn create_reference(&self, kind: ReferenceKind, draft: &ReferenceDraft) -> Result<i64> {
        self.timed("create_reference", || {
            let _guard = acquire_lock(&self.write_lock);
            let key = Self::reference_key(kind);
            let mut rows: Vec<ReferenceRecord> = self.load(key)?;
            let id = self.next_id(key, rows.iter().map(|r| r.id).max().unwrap_or(0))?;
            rows.push(draft.with_id(id));
            self.save(key, &rows)?;
            Ok(id)
        })
    }

    fn put_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()> {
        self.timed("put_reference", || {
            let _guard = acquire_lock(&self.write_lock);
            let key = Self::reference_key(kind);
            let mut rows: Vec<ReferenceRecord> = self.load(key)?;
            match rows.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => rows.push(record.clone()),
            }
            self.save(key, &rows)?;
            self.bump_sequence(key, record.id)
        })
    }

    #[instrument(skip(self, record), fields(operation = "update_reference", backend = BACKEND, id = record.id))]
    fn update_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()> {
        self.timed("update_reference", || {
            let _guard = acquire_lock(&self.write_lock);
            let key = Self::reference_key(kind);
            let mut rows: Vec<ReferenceRecord> = self.load(key)?;
            let existing = rows
                .iter_mut()
                .find(|r| r.id == record.id)
                .ok_or(Error::NotFound {
                    entity: kind.as_str(),
                    id: record.id,
                })?;
            existing.name.clone_from(&record.name);
            existing.icon.clone_from(&record.icon);
            self.save(key, &rows)
        })
    }

    #[instrument(skip(self), fields(operation = "delete_reference", backend = BACKEND))]
    fn delete_reference(&self, kind: ReferenceKind, id: i64) -> Result<()> {
        self.timed("delete_reference", || {
            let _guard = acquire_lock(&self.write_lock);
            let key = Self::reference_key(kind);
            let mut rows: Vec<ReferenceRecord> = self.load(key)?;
            let before = rows.len();
            rows.retain(|r| r.id != id);
            if rows.len() == before {
                return Err(Error::NotFound {
                    entity: kind.as_str(),
                    id,
                });
            }
            self.save(key, &rows)
        })
    }

    fn list_food_items(&self) -> Result<Vec<FoodItem>> {
        self.timed("list_food_items", || {
            let mut rows: Vec<FoodItem> = self.load(FOOD_ITEMS_KEY)?;
            rows.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date).then(a.id.cmp(&b.id)));
            Ok(rows)
        })
    }

    fn get_food_item(&self, id: i64) -> Result<Option<FoodItem>> {
        self.timed("get_food_item", || {
            let rows: Vec<FoodItem> = self.load(FOOD_ITEMS_KEY)?;
            Ok(rows.into_iter().find(|i| i.id == id))
        })
    }

    #[instrument(skip(self, draft), fields(operation = "create_food_item", backend = BACKEND))]
    fn create_food_item(&self, draft: &FoodItemDraft, created_at: NaiveDate) -> Result<i64> {
        self.timed("create_food_item", || {
            let _guard = acquire_lock(&self.write_lock);
            let mut rows: Vec<FoodItem> = self.load(FOOD_ITEMS_KEY)?;
            let id = self.next_id(FOOD_ITEMS_KEY, rows.iter().map(|i| i.id).max().unwrap_or(0))?;
            rows.push(draft.clone().into_item(id, created_at));
            self.save(FOOD_ITEMS_KEY, &rows)?;
            Ok(id)
        })
    }

    #[instrument(skip(self, item), fields(operation = "update_food_item", backend = BACKEND, id = item.id))]
    fn update_food_item(&self, item: &FoodItem) -> Result<()> {
        self.timed("update_food_item", || {
            let _guard = acquire_lock(&self.write_lock);
            let mut rows: Vec<FoodItem> = self.load(FOOD_ITEMS_KEY)?;
            let existing = rows
                .iter_mut()
                .find(|i| i.id == item.id)
                .ok_or(Error::NotFound {
                    entity: "food item",
                    id: item.id,
                })?;
            let created_at = existing.created_at;
            *existing = FoodItem {
                created_at,
                ..item.clone()
            };
            self.save(FOOD_ITEMS_KEY, &rows)
        })
    }

    #[instrument(skip(self), fields(operation = "delete_food_item", backend = BACKEND))]
    fn delete_food_item(&self, id: i64) -> Result<()> {
        self.timed("delete_food_item", || {
            let _guard = acquire_lock(&self.write_lock);
            let mut rows: Vec<FoodItem> = self.load(FOOD_ITEMS_KEY)?;
            let before = rows.len();
            rows.retain(|i| i.id != id);
            if rows.len() == before {
                return Err(Error::NotFound {
                    entity: "food item",
                    id,
                });
            }
            self.save(FOOD_ITEMS_KEY, &rows)
        })
    }
}
