//! Data models for freshkeep.
//!
//! This module contains the records persisted by the storage backends and the
//! derived, read-only views computed on top of them.

mod food_item;
mod image;
mod language;
mod reference;
mod status;

pub use food_item::{FoodItem, FoodItemDraft, FoodItemWithDetails};
pub use image::{ImageRef, SYMBOL_PREFIX};
pub use language::Language;
pub use reference::{
    Category, Location, ReferenceDraft, ReferenceKind, ReferenceRecord, UNKNOWN_ICON, UNKNOWN_NAME,
};
pub use status::{EXPIRING_SOON_DAYS, ExpiryStatus, Freshness};

/// Format used for every persisted calendar date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
