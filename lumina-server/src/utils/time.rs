//! Time helpers for date-granularity campaign logic
//!
//! Repositories receive `i64` Unix millis; campaign start/expiry checks
//! compare calendar dates (UTC). Day-boundary helpers return millis so the
//! SQL side can filter with plain integer comparisons.

use chrono::{NaiveDate, NaiveTime};

/// Time source injected into services
///
/// `Fixed` pins the instant so window checks and sweeps are testable.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    System,
    Fixed(i64),
}

impl Clock {
    pub fn now_millis(&self) -> i64 {
        match self {
            Clock::System => shared::util::now_millis(),
            Clock::Fixed(millis) => *millis,
        }
    }

    /// Calendar date (UTC) of the current instant
    pub fn today(&self) -> NaiveDate {
        millis_to_date(self.now_millis())
    }

    /// Start of today (00:00 UTC) in Unix millis
    pub fn today_start_millis(&self) -> i64 {
        day_start_millis(self.today())
    }

    /// Start of tomorrow in Unix millis; callers use `< end` semantics
    pub fn next_day_start_millis(&self) -> i64 {
        day_end_millis(self.today())
    }
}

/// Unix millis → calendar date (UTC)
pub fn millis_to_date(millis: i64) -> NaiveDate {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

/// Date start (00:00:00 UTC) → Unix millis
pub fn day_start_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Date end → next day 00:00:00 in Unix millis (`< end` exclusive bound)
pub fn day_end_millis(date: NaiveDate) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    next_day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
