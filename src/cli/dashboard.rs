//! Dashboard counts and diagnostics.

use crate::services::{CacheStatus, DashboardCounts};
use std::io::{self, Write};

/// Writes the per-status tally.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_dashboard<W: Write>(writer: &mut W, counts: &DashboardCounts) -> io::Result<()> {
    writeln!(writer, "Total:          {}", counts.total)?;
    writeln!(writer, "Expired:        {}", counts.expired)?;
    writeln!(writer, "Expiring soon:  {}", counts.expiring_soon)?;
    writeln!(writer, "Fresh:          {}", counts.fresh)
}

/// Writes backend and cache diagnostics.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_status<W: Write>(
    writer: &mut W,
    status: &CacheStatus,
    recovery_attempts: u64,
) -> io::Result<()> {
    writeln!(writer, "Backend:            {}", status.backend_state)?;
    writeln!(writer, "Recovery attempts:  {recovery_attempts}")?;
    writeln!(writer, "Data version:       {}", status.data_version)?;
    writeln!(writer, "Data available:     {}", status.data_available)?;
    if let Some(at) = status.last_refreshed {
        writeln!(writer, "Last refreshed:     {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    writeln!(writer)?;
    writeln!(writer, "{:<14}{:<8}{:<7}{:>6}  AGE", "COLLECTION", "CACHED", "STALE", "ROWS")?;
    for c in &status.collections {
        let age = c
            .age_secs
            .map_or_else(|| "-".to_string(), |secs| format!("{secs}s"));
        writeln!(
            writer,
            "{:<14}{:<8}{:<7}{:>6}  {age}",
            c.collection, c.cached, c.stale, c.rows
        )?;
    }
    if let Some(warning) = &status.last_integrity_warning {
        writeln!(writer)?;
        writeln!(writer, "Integrity warning: {warning}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CacheCollection, CollectionStatus};

    #[test]
    fn test_write_dashboard() {
        let counts = DashboardCounts {
            total: 4,
            expired: 1,
            expiring_soon: 2,
            fresh: 1,
        };
        let mut buffer = Vec::new();
        write_dashboard(&mut buffer, &counts).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("Expiring soon:  2"));
    }

    #[test]
    fn test_write_status() {
        let status = CacheStatus {
            collections: vec![CollectionStatus {
                collection: CacheCollection::FoodItems,
                cached: true,
                stale: false,
                age_secs: Some(12),
                rows: 3,
            }],
            data_version: 7,
            data_available: true,
            backend_state: "degraded".to_string(),
            last_refreshed: None,
            last_integrity_warning: Some("corruption detected in categories".to_string()),
        };
        let mut buffer = Vec::new();
        write_status(&mut buffer, &status, 1).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("Backend:            degraded"));
        assert!(output.contains("food_items"));
        assert!(output.contains("12s"));
        assert!(output.contains("Integrity warning"));
    }
}
