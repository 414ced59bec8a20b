//! Reference data corruption heuristic.

use crate::models::{ReferenceKind, ReferenceRecord};
use crate::{Error, Result};

/// Collections smaller than this are never flagged.
pub const MIN_ROWS: usize = 3;

/// Placeholder share, in percent, at or above which a collection is flagged.
pub const PLACEHOLDER_PERCENT: usize = 80;

/// Flags a reference collection dominated by placeholder rows.
///
/// # Errors
///
/// Returns [`Error::CorruptionDetected`] when at least [`MIN_ROWS`] rows are
/// present and [`PLACEHOLDER_PERCENT`] of them or more are placeholders.
pub fn check_references(kind: ReferenceKind, rows: &[ReferenceRecord]) -> Result<()> {
    let total_rows = rows.len();
    if total_rows < MIN_ROWS {
        return Ok(());
    }
    let placeholder_rows = rows.iter().filter(|r| r.is_placeholder()).count();
    if placeholder_rows * 100 >= total_rows * PLACEHOLDER_PERCENT {
        return Err(Error::CorruptionDetected {
            collection: kind.table(),
            placeholder_rows,
            total_rows,
        });
    }
    Ok(())
}
