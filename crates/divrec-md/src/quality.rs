//! Data-quality report for a price series and its dividend history.
//!
//! Covers:
//! - record / event counts and the covered date span
//! - records dated on a weekend (a sign of a shifted time zone upstream)
//! - zero-volume records
//! - weekday gaps between consecutive records beyond a tolerance
//! - ex-dates that have no matching trading day in the price series
//!
//! The last item is the provider misalignment the analyzer's missing-ex-date
//! policy has to handle; the report lets callers see it up front.
//!
//! This module does **not** reject anything; table invariants are enforced
//! at construction (see `series.rs`).

use std::fmt;

use chrono::NaiveDate;

use crate::calendar::{is_business_day, weekdays_between};
use crate::series::{DividendHistory, PriceSeries};

// ---------------------------------------------------------------------------
// Issue types
// ---------------------------------------------------------------------------

/// Consecutive records separated by more missing weekdays than tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapIssue {
    pub prev_date: NaiveDate,
    pub next_date: NaiveDate,
    pub missing_weekdays: u32,
}

/// An ex-date with no price record on that exact day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnalignedExDate {
    pub ex_date: NaiveDate,
    pub amount_micros: i64,
    /// `true` when the ex-date lies before the first or after the last record.
    pub outside_series: bool,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub symbol: String,
    pub total_records: usize,
    pub dividend_events: usize,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub zero_volume_records: usize,
    pub weekend_records: Vec<NaiveDate>,
    /// Sorted by `prev_date`.
    pub gaps: Vec<GapIssue>,
    /// Sorted by `ex_date`.
    pub unaligned_ex_dates: Vec<UnalignedExDate>,
}

impl QualityReport {
    /// `true` when no issue list has entries. Zero-volume records are
    /// informational only.
    pub fn is_clean(&self) -> bool {
        self.weekend_records.is_empty()
            && self.gaps.is_empty()
            && self.unaligned_ex_dates.is_empty()
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |d: Option<NaiveDate>| d.map(|v| v.to_string()).unwrap_or_else(|| "none".into());
        writeln!(f, "QualityReport {} {{", self.symbol)?;
        writeln!(f, "  total_records: {}", self.total_records)?;
        writeln!(f, "  dividend_events: {}", self.dividend_events)?;
        writeln!(f, "  earliest_date: {}", opt(self.earliest_date))?;
        writeln!(f, "  latest_date: {}", opt(self.latest_date))?;
        writeln!(f, "  zero_volume_records: {}", self.zero_volume_records)?;
        writeln!(f, "  weekend_records: {}", self.weekend_records.len())?;
        for d in &self.weekend_records {
            writeln!(f, "    {d}")?;
        }
        writeln!(f, "  gaps: {}", self.gaps.len())?;
        for g in &self.gaps {
            writeln!(
                f,
                "    prev={} next={} missing_weekdays={}",
                g.prev_date, g.next_date, g.missing_weekdays
            )?;
        }
        writeln!(f, "  unaligned_ex_dates: {}", self.unaligned_ex_dates.len())?;
        for u in &self.unaligned_ex_dates {
            writeln!(
                f,
                "    ex_date={} amount_micros={} outside_series={}",
                u.ex_date, u.amount_micros, u.outside_series
            )?;
        }
        write!(f, "}}")
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Build a [`QualityReport`].
///
/// `gap_tolerance_weekdays` is the number of consecutive missing weekdays
/// accepted silently; `1` tolerates single exchange holidays.
pub fn build_quality_report(
    series: &PriceSeries,
    dividends: &DividendHistory,
    gap_tolerance_weekdays: u32,
) -> QualityReport {
    let records = series.records();

    let weekend_records = records
        .iter()
        .filter(|r| !is_business_day(r.date))
        .map(|r| r.date)
        .collect();

    let gaps = records
        .windows(2)
        .filter_map(|w| {
            let missing = weekdays_between(w[0].date, w[1].date);
            (missing > gap_tolerance_weekdays).then(|| GapIssue {
                prev_date: w[0].date,
                next_date: w[1].date,
                missing_weekdays: missing,
            })
        })
        .collect();

    let (first, last) = (series.first_date(), series.last_date());
    let unaligned_ex_dates = dividends
        .records()
        .iter()
        .filter(|d| !series.contains(d.ex_date))
        .map(|d| UnalignedExDate {
            ex_date: d.ex_date,
            amount_micros: d.amount_micros,
            outside_series: match (first, last) {
                (Some(f), Some(l)) => d.ex_date < f || d.ex_date > l,
                _ => true,
            },
        })
        .collect();

    QualityReport {
        symbol: series.symbol().to_string(),
        total_records: records.len(),
        dividend_events: dividends.len(),
        earliest_date: first,
        latest_date: last,
        zero_volume_records: records.iter().filter(|r| r.volume == 0).count(),
        weekend_records,
        gaps,
        unaligned_ex_dates,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
