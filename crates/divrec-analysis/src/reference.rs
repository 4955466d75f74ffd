//! Reference-date resolution.
//!
//! The reference date is the pre-dividend baseline: start `offset_days`
//! calendar days before the ex-date and walk back one calendar day at a time
//! until a weekday that has a price record. Holidays need no calendar; they
//! are simply absent from the series. If the walk runs past the first record
//! the result clamps to the first record.

use chrono::{Days, NaiveDate};
use divrec_md::{is_business_day, PriceRecord, PriceSeries};

use crate::error::AnalysisError;

/// Resolve the reference record for an event with the given ex-date.
pub fn resolve_reference_record(
    series: &PriceSeries,
    ex_date: NaiveDate,
    offset_days: u32,
) -> Result<&PriceRecord, AnalysisError> {
    let unresolved = || AnalysisError::ReferenceDateUnresolved {
        symbol: series.symbol().to_string(),
    };
    let first = series.records().first().ok_or_else(unresolved)?;

    let start = ex_date
        .checked_sub_days(Days::new(u64::from(offset_days)))
        .unwrap_or(first.date);

    // Records dated on or before `start`, newest first. Walking calendar days
    // backwards and stopping at the first present weekday is the same as
    // taking the newest such record.
    let hit = series
        .up_to(start)
        .iter()
        .rev()
        .find(|r| is_business_day(r.date));

    Ok(hit.unwrap_or(first))
}

/// Date-only form of [`resolve_reference_record`].
pub fn resolve_reference_date(
    series: &PriceSeries,
    ex_date: NaiveDate,
    offset_days: u32,
) -> Result<NaiveDate, AnalysisError> {
    resolve_reference_record(series, ex_date, offset_days).map(|r| r.date)
}
