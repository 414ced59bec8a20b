//! Reference data: categories and storage locations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name used when a food item's category or location cannot be resolved.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Icon used when a food item's category or location cannot be resolved.
pub const UNKNOWN_ICON: &str = "help-circle";

/// The two reference tables. Each has its own id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Food categories (dairy, meat, ...).
    Category,
    /// Storage locations (fridge, pantry, ...).
    Location,
}

impl ReferenceKind {
    /// Returns both kinds.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Category, Self::Location]
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Location => "location",
        }
    }

    /// Name of the structured-engine table holding this kind.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Location => "locations",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted category or location row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Identifier, assigned on create and never changed.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Icon key understood by the presentation layer.
    pub icon: String,
}

impl ReferenceRecord {
    /// Creates a record with an explicit id.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            icon: icon.into(),
        }
    }

    /// Returns true if the row carries only sentinel or placeholder values.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        let name = self.name.trim();
        name.is_empty() || name.eq_ignore_ascii_case(UNKNOWN_NAME) || self.icon == UNKNOWN_ICON
    }
}

/// A category row.
pub type Category = ReferenceRecord;

/// A location row.
pub type Location = ReferenceRecord;

/// Input for creating a category or location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDraft {
    /// Display name. Must not be blank.
    pub name: String,
    /// Icon key.
    pub icon: String,
}

impl ReferenceDraft {
    /// Creates a new draft.
    #[must_use]
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
        }
    }

    /// Attaches an id, producing the stored form of this draft.
    #[must_use]
    pub fn with_id(&self, id: i64) -> ReferenceRecord {
        ReferenceRecord::new(id, self.name.clone(), self.icon.clone())
    }
}
