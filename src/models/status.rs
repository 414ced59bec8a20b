//! Freshness classification types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Items expiring within this many days (inclusive) are "expiring soon".
///
/// Independent of a food item's `reminder_days`, which only drives
/// notification timing.
pub const EXPIRING_SOON_DAYS: i64 = 5;

/// Three-state freshness of a food item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    /// Past its expiry date.
    Expired,
    /// Expires today or within [`EXPIRING_SOON_DAYS`].
    ExpiringSoon,
    /// More than [`EXPIRING_SOON_DAYS`] left.
    Fresh,
}

impl ExpiryStatus {
    /// Returns all statuses, most urgent first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Expired, Self::ExpiringSoon, Self::Fresh]
    }

    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::ExpiringSoon => "expiring_soon",
            Self::Fresh => "fresh",
        }
    }

    /// Parses a status string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "expired" => Some(Self::Expired),
            "expiring_soon" | "expiring-soon" | "expiringsoon" | "soon" => Some(Self::ExpiringSoon),
            "fresh" => Some(Self::Fresh),
            _ => None,
        }
    }
}

impl fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived freshness of a single item relative to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freshness {
    /// Whole days from the reference date to the expiry date. Negative once expired.
    pub days_until_expiry: i64,
    /// Classification derived from `days_until_expiry`.
    pub status: ExpiryStatus,
}
