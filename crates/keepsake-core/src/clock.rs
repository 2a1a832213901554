//! Source of the current calendar date.
//!
//! The local wall-clock date is authoritative; there is no timezone
//! normalization across devices.

use chrono::{Local, NaiveDate};

/// Supplies "today" to the reconciler.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local system date.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date, for tests and `--today` overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
