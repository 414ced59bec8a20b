//! Shared fixtures for integration tests.
//!
//! [`FaultyOpener`] hands out real in-memory backends wrapped in
//! [`FaultyBackend`], whose probes, statements and opens can be made to fail
//! on demand.

#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc)]

use chrono::NaiveDate;
use freshkeep::models::{
    FoodItem, FoodItemDraft, Language, ReferenceDraft, ReferenceKind, ReferenceRecord,
};
use freshkeep::storage::{
    BackendKind, BackendOpener, FlatStore, MemoryKeyValueStore, SqliteEngine, StorageBackend,
};
use freshkeep::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Builds a date, panicking on invalid input.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Switches and counters shared between a [`FaultyOpener`] and its backends.
#[derive(Debug, Default)]
pub struct Faults {
    /// Probes of structured backends fail.
    pub structured_probe_fails: AtomicBool,
    /// Probes of the flat backend fail.
    pub flat_probe_fails: AtomicBool,
    /// Statements on structured backends fail while their probes still pass.
    pub structured_statements_fail: AtomicBool,
    /// The next reference read switches `structured_probe_fails` on.
    pub fail_liveness_after_reference_read: AtomicBool,
    /// Opening a structured backend fails.
    pub structured_open_fails: AtomicBool,
    /// Opening the flat backend fails.
    pub flat_open_fails: AtomicBool,
    /// The next structured open fails, then the switch clears itself.
    pub fail_next_structured_open: AtomicBool,
    /// Structured open attempts.
    pub structured_opens: AtomicUsize,
    /// Flat open attempts.
    pub flat_opens: AtomicUsize,
}

impl Faults {
    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn structured_opens(&self) -> usize {
        self.structured_opens.load(Ordering::SeqCst)
    }

    pub fn flat_opens(&self) -> usize {
        self.flat_opens.load(Ordering::SeqCst)
    }
}

fn injected(operation: &str) -> Error {
    Error::ConnectionLost {
        operation: operation.to_string(),
        cause: "injected fault".to_string(),
    }
}

/// Opener over in-memory backends with injectable faults.
#[derive(Default)]
pub struct FaultyOpener {
    faults: Arc<Faults>,
    flat: Arc<MemoryKeyValueStore>,
}

impl FaultyOpener {
    pub fn new() -> (Self, Arc<Faults>) {
        let opener = Self::default();
        let faults = opener.faults.clone();
        (opener, faults)
    }
}

impl BackendOpener for FaultyOpener {
    fn open_structured(&self, _identifier: &str) -> Result<Arc<dyn StorageBackend>> {
        self.faults.structured_opens.fetch_add(1, Ordering::SeqCst);
        if self.faults.structured_open_fails.load(Ordering::SeqCst)
            || self.faults.fail_next_structured_open.swap(false, Ordering::SeqCst)
        {
            return Err(injected("open_structured"));
        }
        Ok(Arc::new(FaultyBackend {
            inner: Box::new(SqliteEngine::in_memory()?),
            faults: self.faults.clone(),
        }))
    }

    fn open_flat(&self) -> Result<Arc<dyn StorageBackend>> {
        self.faults.flat_opens.fetch_add(1, Ordering::SeqCst);
        if self.faults.flat_open_fails.load(Ordering::SeqCst) {
            return Err(injected("open_flat"));
        }
        Ok(Arc::new(FaultyBackend {
            inner: Box::new(FlatStore::new(self.flat.clone())),
            faults: self.faults.clone(),
        }))
    }
}

/// Delegates to a real backend, consulting the fault switches first.
pub struct FaultyBackend {
    inner: Box<dyn StorageBackend>,
    faults: Arc<Faults>,
}

impl FaultyBackend {
    fn statement(&self, operation: &str) -> Result<()> {
        if self.inner.kind() == BackendKind::Structured
            && self.faults.structured_statements_fail.load(Ordering::SeqCst)
        {
            return Err(injected(operation));
        }
        Ok(())
    }
}

impl StorageBackend for FaultyBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn probe(&self) -> Result<()> {
        let flag = match self.inner.kind() {
            BackendKind::Structured => &self.faults.structured_probe_fails,
            BackendKind::Flat => &self.faults.flat_probe_fails,
        };
        if flag.load(Ordering::SeqCst) {
            return Err(injected("probe"));
        }
        self.inner.probe()
    }

    fn ensure_schema(&self) -> Result<()> {
        self.inner.ensure_schema()
    }

    fn seeded_language(&self) -> Result<Option<Language>> {
        self.statement("seeded_language")?;
        self.inner.seeded_language()
    }

    fn mark_initialized(&self, language: Language) -> Result<()> {
        self.statement("mark_initialized")?;
        self.inner.mark_initialized(language)
    }

    fn reset(&self) -> Result<()> {
        self.statement("reset")?;
        self.inner.reset()
    }

    fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceRecord>> {
        self.statement("list_references")?;
        if self.faults.fail_liveness_after_reference_read.swap(false, Ordering::SeqCst) {
            self.faults.structured_probe_fails.store(true, Ordering::SeqCst);
        }
        self.inner.list_references(kind)
    }

    fn get_reference(&self, kind: ReferenceKind, id: i64) -> Result<Option<ReferenceRecord>> {
        self.statement("get_reference")?;
        self.inner.get_reference(kind, id)
    }

    fn create_reference(&self, kind: ReferenceKind, draft: &ReferenceDraft) -> Result<i64> {
        self.statement("create_reference")?;
        self.inner.create_reference(kind, draft)
    }

    fn put_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()> {
        self.statement("put_reference")?;
        self.inner.put_reference(kind, record)
    }

    fn update_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()> {
        self.statement("update_reference")?;
        self.inner.update_reference(kind, record)
    }

    fn delete_reference(&self, kind: ReferenceKind, id: i64) -> Result<()> {
        self.statement("delete_reference")?;
        self.inner.delete_reference(kind, id)
    }

    fn list_food_items(&self) -> Result<Vec<FoodItem>> {
        self.statement("list_food_items")?;
        self.inner.list_food_items()
    }

    fn get_food_item(&self, id: i64) -> Result<Option<FoodItem>> {
        self.statement("get_food_item")?;
        self.inner.get_food_item(id)
    }

    fn create_food_item(&self, draft: &FoodItemDraft, created_at: NaiveDate) -> Result<i64> {
        self.statement("create_food_item")?;
        self.inner.create_food_item(draft, created_at)
    }

    fn update_food_item(&self, item: &FoodItem) -> Result<()> {
        self.statement("update_food_item")?;
        self.inner.update_food_item(item)
    }

    fn delete_food_item(&self, id: i64) -> Result<()> {
        self.statement("delete_food_item")?;
        self.inner.delete_food_item(id)
    }
}
