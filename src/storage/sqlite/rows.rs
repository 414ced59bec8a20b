//! Row conversion for the structured engine.

use crate::models::{DATE_FORMAT, FoodItem, ReferenceRecord};
use crate::{Error, Result};
use chrono::NaiveDate;
use rusqlite::Row;

/// Column list matching [`FoodItemRow::from_row`].
pub const FOOD_ITEM_COLUMNS: &str = "id, name, quantity, category_id, location_id, expiry_date, \
     reminder_days, notes, image_uri, created_at";

/// Raw food item row as stored, before date parsing.
#[derive(Debug)]
pub struct FoodItemRow {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub expiry_date: String,
    pub reminder_days: i64,
    pub notes: Option<String>,
    pub image_uri: Option<String>,
    pub created_at: String,
}

impl FoodItemRow {
    /// Reads a row selected with [`FOOD_ITEM_COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
            category_id: row.get(3)?,
            location_id: row.get(4)?,
            expiry_date: row.get(5)?,
            reminder_days: row.get(6)?,
            notes: row.get(7)?,
            image_uri: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    /// Converts into a [`FoodItem`].
    ///
    /// Negative counts written by older clients clamp to zero.
    pub fn into_item(self) -> Result<FoodItem> {
        Ok(FoodItem {
            id: self.id,
            expiry_date: parse_date("food_items.expiry_date", &self.expiry_date)?,
            created_at: parse_date("food_items.created_at", &self.created_at)?,
            name: self.name,
            quantity: u32::try_from(self.quantity.max(0)).unwrap_or(u32::MAX),
            category_id: self.category_id,
            location_id: self.location_id,
            reminder_days: u32::try_from(self.reminder_days.max(0)).unwrap_or(u32::MAX),
            notes: self.notes,
            image_uri: self.image_uri,
        })
    }
}

/// Reads a `(id, name, icon)` row.
pub fn reference_from_row(row: &Row<'_>) -> rusqlite::Result<ReferenceRecord> {
    Ok(ReferenceRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
    })
}

/// Formats a date for storage.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(column: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| Error::Serialization {
        key: column.to_string(),
        cause: format!("'{value}': {e}"),
    })
}
