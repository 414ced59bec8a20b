//! Food item table.

use super::truncate;
use crate::models::{FoodItemWithDetails, ImageRef};
use std::io::{self, Write};

/// Writes food items as a table.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_items_table<W: Write>(writer: &mut W, items: &[FoodItemWithDetails]) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(writer, "No food items.");
    }
    writeln!(
        writer,
        "{:<6}{:<22}{:>4}  {:<12}{:>6}  {:<15}{:<18}{:<18}",
        "ID", "NAME", "QTY", "EXPIRES", "DAYS", "STATUS", "CATEGORY", "LOCATION"
    )?;
    for d in items {
        let name = match d.item.image_uri.as_deref().map(ImageRef::parse) {
            Some(ImageRef::Symbol(symbol)) => format!("{symbol} {}", d.item.name),
            _ => d.item.name.clone(),
        };
        writeln!(
            writer,
            "{:<6}{:<22}{:>4}  {:<12}{:>6}  {:<15}{:<18}{:<18}",
            d.item.id,
            truncate(&name, 21),
            d.item.quantity,
            d.item.expiry_date,
            d.days_until_expiry,
            d.status,
            truncate(&d.category_name, 17),
            truncate(&d.location_name, 17),
        )?;
    }
    Ok(())
}
