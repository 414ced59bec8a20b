//! Storage backend trait.

use crate::models::{
    FoodItem, FoodItemDraft, Language, ReferenceDraft, ReferenceKind, ReferenceRecord,
};
use crate::Result;
use std::fmt;

/// Which implementation backs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The `SQLite` structured engine.
    Structured,
    /// The schemaless key-value fallback.
    Flat,
}

impl BackendKind {
    /// Returns the kind as a string slice (also used as a metrics label).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uniform CRUD surface over the structured engine and the flat store.
///
/// Backends hold only their connection or handle; they keep no business data
/// in memory between calls. Lookups by id return `Ok(None)` on a miss, while
/// update and delete of a missing row return [`crate::Error::NotFound`].
/// Deleting a reference row never touches food items.
pub trait StorageBackend: Send + Sync {
    /// Returns which implementation this is.
    fn kind(&self) -> BackendKind;

    /// Cheap round trip used for health checking.
    fn probe(&self) -> Result<()>;

    /// Creates or validates the schema. Idempotent.
    fn ensure_schema(&self) -> Result<()>;

    /// Returns the language default reference data was last seeded in,
    /// or `None` if it has never been seeded.
    fn seeded_language(&self) -> Result<Option<Language>>;

    /// Records that default reference data has been seeded in `language`.
    fn mark_initialized(&self, language: Language) -> Result<()>;

    /// Returns true once default reference data has been seeded.
    fn is_initialized(&self) -> Result<bool> {
        Ok(self.seeded_language()?.is_some())
    }

    /// Deletes every row and clears the initialized flag.
    fn reset(&self) -> Result<()>;

    /// Lists all rows of a reference table, ordered by id.
    fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceRecord>>;

    /// Looks up a reference row by id.
    fn get_reference(&self, kind: ReferenceKind, id: i64) -> Result<Option<ReferenceRecord>>;

    /// Inserts a reference row and returns its new id.
    fn create_reference(&self, kind: ReferenceKind, draft: &ReferenceDraft) -> Result<i64>;

    /// Inserts or replaces a reference row at the record's own id.
    fn put_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()>;

    /// Replaces the name and icon of an existing reference row.
    fn update_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()>;

    /// Deletes a reference row.
    fn delete_reference(&self, kind: ReferenceKind, id: i64) -> Result<()>;

    /// Lists all food items, unjoined, ordered by expiry date then id.
    fn list_food_items(&self) -> Result<Vec<FoodItem>>;

    /// Looks up a food item by id.
    fn get_food_item(&self, id: i64) -> Result<Option<FoodItem>>;

    /// Inserts a food item and returns its new id.
    fn create_food_item(&self, draft: &FoodItemDraft, created_at: chrono::NaiveDate) -> Result<i64>;

    /// Replaces every field of an existing food item except `created_at`.
    fn update_food_item(&self, item: &FoodItem) -> Result<()>;

    /// Deletes a food item.
    fn delete_food_item(&self, id: i64) -> Result<()>;
}
