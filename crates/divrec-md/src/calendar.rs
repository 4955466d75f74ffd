//! Weekday trading calendar.
//!
//! Deterministic, pure logic. No IO, no wall-clock.
//!
//! Only the weekend rule lives here. Exchange holidays need no table: a day
//! the exchange was closed is simply absent from the price series, so callers
//! combine [`is_business_day`] with a presence check on the series.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// `true` for Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of business days in the **open** interval `(prev, next)`.
///
/// For two consecutive records of a daily series this is the count of
/// weekdays the series skipped (holidays or missing data). Weekends
/// never count. Returns 0 when `next <= prev`.
pub fn weekdays_between(prev: NaiveDate, next: NaiveDate) -> u32 {
    let mut count = 0u32;
    let mut d = prev + Duration::days(1);
    while d < next {
        if is_business_day(d) {
            count += 1;
        }
        d += Duration::days(1);
    }
    count
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
