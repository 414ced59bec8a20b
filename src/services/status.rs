//! Freshness derivation.

use crate::models::{EXPIRING_SOON_DAYS, ExpiryStatus, Freshness};
use chrono::{DateTime, NaiveDate, TimeZone};

/// Classifies an expiry date relative to `today`.
///
/// Pure and deterministic: the result depends only on the two dates.
#[must_use]
pub fn classify(today: NaiveDate, expiry: NaiveDate) -> Freshness {
    let days_until_expiry = expiry.signed_duration_since(today).num_days();
    let status = if days_until_expiry < 0 {
        ExpiryStatus::Expired
    } else if days_until_expiry <= EXPIRING_SOON_DAYS {
        ExpiryStatus::ExpiringSoon
    } else {
        ExpiryStatus::Fresh
    };
    Freshness {
        days_until_expiry,
        status,
    }
}

/// Classifies an expiry date relative to the calendar date of `now`.
///
/// The time of day is discarded, so 23:59 and 00:01 on the same date agree.
#[must_use]
pub fn classify_at<Tz: TimeZone>(now: &DateTime<Tz>, expiry: NaiveDate) -> Freshness {
    classify(now.date_naive(), expiry)
}
