//! Injected clock abstraction.
//!
//! The scheduler never reads the OS clock directly -- every compute pass is
//! a pure function of its snapshot, and the snapshot carries the timestamp
//! it was taken at. Callers inject a `Clock` so tests can pin time.

use chrono::{DateTime, NaiveDate, Utc};

/// Time source for the planner.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar date for a given instant.
    fn local_date_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.date_naive()
    }

    /// Today's local date.
    fn today(&self) -> NaiveDate {
        self.local_date_of(self.now())
    }
}

/// Wall-clock implementation for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
