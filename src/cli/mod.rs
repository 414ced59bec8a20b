//! CLI rendering.
//!
//! The `freshkeep` binary parses arguments and calls into the cache; this
//! module turns the results into tables or JSON on any writer.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `add` | Record a food item |
//! | `list` | List food items, optionally by status |
//! | `update` | Change fields of a food item |
//! | `remove` | Delete a food item |
//! | `category` / `location` | Manage reference data |
//! | `language` | Re-seed default names in another language |
//! | `dashboard` | Per-status counts |
//! | `status` | Backend and cache diagnostics |
//! | `reset` | Delete everything and re-seed |
//!
//! # Example Usage
//!
//! ```bash
//! freshkeep add "Milk" --expires 2024-01-05 --category 1 --location 1
//! freshkeep list --status expiring_soon
//! freshkeep language es
//! ```

mod dashboard;
mod items;
mod references;

pub use dashboard::{write_dashboard, write_status};
pub use items::write_items_table;
pub use references::write_references_table;

use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns (default).
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        })
    }
}

/// Writes any serializable value as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
    writeln!(writer, "{json}")
}

/// Shortens `s` to at most `width` characters, marking the cut with `~`.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}
