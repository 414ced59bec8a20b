//! Category and location table.

use crate::models::ReferenceRecord;
use std::io::{self, Write};

/// Writes categories or locations as a table.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_references_table<W: Write>(writer: &mut W, rows: &[ReferenceRecord]) -> io::Result<()> {
    writeln!(writer, "{:<6}{:<24}ICON", "ID", "NAME")?;
    for row in rows {
        writeln!(writer, "{:<6}{:<24}{}", row.id, row.name, row.icon)?;
    }
    Ok(())
}
