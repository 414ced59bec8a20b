//! Source of "today" for creation stamps and freshness derivation.

use crate::storage::acquire_lock;
use chrono::{Days, Local, NaiveDate};
use std::sync::Mutex;

/// Provides the current calendar date.
pub trait Clock: Send + Sync {
    /// Returns today's date.
    fn today(&self) -> NaiveDate;
}

/// The local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    /// Creates a clock frozen at `today`.
    #[must_use]
    pub const fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    /// Moves the clock to `today`.
    pub fn set(&self, today: NaiveDate) {
        *acquire_lock(&self.today) = today;
    }

    /// Moves the clock forward by `days`.
    pub fn advance(&self, days: u64) {
        let mut today = acquire_lock(&self.today);
        if let Some(next) = today.checked_add_days(Days::new(days)) {
            *today = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *acquire_lock(&self.today)
    }
}
