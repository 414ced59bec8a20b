//! Food item records and their detail view.

use super::status::{ExpiryStatus, Freshness};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A persisted food item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    /// Identifier, assigned on create.
    pub id: i64,
    /// Display name. Never blank.
    pub name: String,
    /// Number of units on hand.
    pub quantity: u32,
    /// Category reference. May dangle after the category is deleted.
    pub category_id: Option<i64>,
    /// Location reference. May dangle after the location is deleted.
    pub location_id: Option<i64>,
    /// Calendar expiry date.
    pub expiry_date: NaiveDate,
    /// Days before expiry to remind the user. Only used for notifications.
    pub reminder_days: u32,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Media reference or symbolic image token (see [`super::ImageRef`]).
    pub image_uri: Option<String>,
    /// Date the item was recorded.
    pub created_at: NaiveDate,
}

impl FoodItem {
    /// Returns the writable fields of this item.
    #[must_use]
    pub fn to_draft(&self) -> FoodItemDraft {
        FoodItemDraft {
            name: self.name.clone(),
            quantity: self.quantity,
            category_id: self.category_id,
            location_id: self.location_id,
            expiry_date: self.expiry_date,
            reminder_days: self.reminder_days,
            notes: self.notes.clone(),
            image_uri: self.image_uri.clone(),
        }
    }
}

/// Input for creating a food item.
///
/// `id` and `created_at` are assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodItemDraft {
    /// Display name. Must not be blank.
    pub name: String,
    /// Number of units on hand.
    pub quantity: u32,
    /// Category reference.
    pub category_id: Option<i64>,
    /// Location reference.
    pub location_id: Option<i64>,
    /// Calendar expiry date.
    pub expiry_date: NaiveDate,
    /// Days before expiry to remind the user.
    pub reminder_days: u32,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Media reference or symbolic image token.
    pub image_uri: Option<String>,
}

impl FoodItemDraft {
    /// Creates a draft with a quantity of one and no reminder.
    #[must_use]
    pub fn new(name: impl Into<String>, expiry_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            quantity: 1,
            category_id: None,
            location_id: None,
            expiry_date,
            reminder_days: 0,
            notes: None,
            image_uri: None,
        }
    }

    /// Sets the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Sets the category reference.
    #[must_use]
    pub const fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Sets the location reference.
    #[must_use]
    pub const fn with_location(mut self, location_id: i64) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Sets the reminder lead time.
    #[must_use]
    pub const fn with_reminder_days(mut self, days: u32) -> Self {
        self.reminder_days = days;
        self
    }

    /// Sets the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the image reference.
    #[must_use]
    pub fn with_image_uri(mut self, uri: impl Into<String>) -> Self {
        self.image_uri = Some(uri.into());
        self
    }

    /// Attaches an id and creation date, producing the stored form.
    #[must_use]
    pub fn into_item(self, id: i64, created_at: NaiveDate) -> FoodItem {
        FoodItem {
            id,
            name: self.name,
            quantity: self.quantity,
            category_id: self.category_id,
            location_id: self.location_id,
            expiry_date: self.expiry_date,
            reminder_days: self.reminder_days,
            notes: self.notes,
            image_uri: self.image_uri,
            created_at,
        }
    }
}

/// A food item joined with its reference data and derived status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItemWithDetails {
    /// The underlying record.
    #[serde(flatten)]
    pub item: FoodItem,
    /// Resolved category name, or [`super::UNKNOWN_NAME`].
    pub category_name: String,
    /// Resolved category icon, or [`super::UNKNOWN_ICON`].
    pub category_icon: String,
    /// Resolved location name, or [`super::UNKNOWN_NAME`].
    pub location_name: String,
    /// Resolved location icon, or [`super::UNKNOWN_ICON`].
    pub location_icon: String,
    /// Days from the reference date to expiry.
    pub days_until_expiry: i64,
    /// Freshness classification.
    pub status: ExpiryStatus,
}

impl FoodItemWithDetails {
    /// Returns the derived freshness.
    #[must_use]
    pub const fn freshness(&self) -> Freshness {
        Freshness {
            days_until_expiry: self.days_until_expiry,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_roundtrip() {
        let expiry = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap_or_default();
        let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let draft = FoodItemDraft::new("Milk", expiry)
            .with_category(3)
            .with_location(1)
            .with_reminder_days(1);
        let item = draft.clone().into_item(7, created);
        assert_eq!(item.id, 7);
        assert_eq!(item.created_at, created);
        assert_eq!(item.to_draft(), draft);
    }

    #[test]
    fn test_serialized_dates_are_plain() {
        let expiry = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap_or_default();
        let item = FoodItemDraft::new("Milk", expiry).into_item(1, expiry);
        let json = serde_json::to_value(&item).unwrap_or_default();
        assert_eq!(json["expiry_date"], "2024-01-05");
    }
}
