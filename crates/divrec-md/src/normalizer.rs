//! Canonical normalization of raw price and dividend rows.
//!
//! Converts [`RawPriceRow`] / [`RawDividendRow`] values into validated
//! [`PriceSeries`] / [`DividendHistory`] tables:
//! - prices become integer micros with no floating point at any stage
//! - every date stamp collapses to a calendar date (`NaiveDate`)
//! - a series must use a single date convention: all naive or all
//!   zone-aware; mixing the two is rejected
//! - rows are sorted by date before the table invariants are enforced
//!
//! It does **not** fetch data or produce quality reports (see `quality.rs`).

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::provider::{RawDividendRow, RawPriceRow};
use crate::series::{DividendHistory, DividendRecord, PriceRecord, PriceSeries, SeriesError};

const MICROS_PER_UNIT: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizerError {
    /// A price string was empty.
    EmptyPrice { field: &'static str },
    /// A price string could not be parsed as a decimal number.
    InvalidPrice { field: &'static str, raw: String },
    /// A price had more than 6 decimal places (ambiguous micro conversion).
    TooManyDecimalPlaces { field: &'static str, raw: String },
    /// The volume column was not an integer.
    InvalidVolume(String),
    /// The date stamp matched none of the accepted layouts.
    InvalidDate(String),
    /// OHLC sanity check failed.
    OhlcViolation { date: NaiveDate, detail: String },
    /// Naive and zone-aware stamps were mixed in one series.
    MixedDateConvention { naive_row: usize, aware_row: usize },
    /// The normalized rows broke a table invariant.
    Series(SeriesError),
    /// Wraps another error with the 0-based input row it came from.
    AtRow { row: usize, error: Box<NormalizerError> },
}

impl fmt::Display for NormalizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizerError::EmptyPrice { field } => write!(f, "price field '{field}' is empty"),
            NormalizerError::InvalidPrice { field, raw } => {
                write!(f, "price field '{field}' could not be parsed: '{raw}'")
            }
            NormalizerError::TooManyDecimalPlaces { field, raw } => write!(
                f,
                "price field '{field}' has more than 6 decimal places \
                 (ambiguous micro conversion): '{raw}'"
            ),
            NormalizerError::InvalidVolume(raw) => write!(f, "volume is not an integer: '{raw}'"),
            NormalizerError::InvalidDate(raw) => write!(f, "unrecognised date stamp: '{raw}'"),
            NormalizerError::OhlcViolation { date, detail } => {
                write!(f, "OHLC sanity violation on {date}: {detail}")
            }
            NormalizerError::MixedDateConvention {
                naive_row,
                aware_row,
            } => write!(
                f,
                "series mixes naive (row {naive_row}) and zone-aware (row {aware_row}) date stamps"
            ),
            NormalizerError::Series(e) => write!(f, "{e}"),
            NormalizerError::AtRow { row, error } => write!(f, "row {row}: {error}"),
        }
    }
}

impl std::error::Error for NormalizerError {}

impl From<SeriesError> for NormalizerError {
    fn from(e: SeriesError) -> Self {
        NormalizerError::Series(e)
    }
}

fn at_row(row: usize) -> impl FnOnce(NormalizerError) -> NormalizerError {
    move |error| NormalizerError::AtRow {
        row,
        error: Box::new(error),
    }
}

// ---------------------------------------------------------------------------
// Price conversion
// ---------------------------------------------------------------------------

/// Convert a decimal string to integer micros deterministically.
///
/// Accepts an optional sign and an optional fractional part of at most six
/// digits. Anything else (`NaN`, `inf`, exponents, several dots) is rejected.
pub fn price_to_micros(s: &str, field: &'static str) -> Result<i64, NormalizerError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(NormalizerError::EmptyPrice { field });
    }
    let invalid = || NormalizerError::InvalidPrice {
        field,
        raw: s.to_string(),
    };

    let (negative, digits) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

    let is_digits = |p: &str| p.bytes().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part)
    {
        return Err(invalid());
    }
    if frac_part.len() > 6 {
        return Err(NormalizerError::TooManyDecimalPlaces {
            field,
            raw: s.to_string(),
        });
    }

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    let frac_val: i64 = format!("{frac_part:0<6}").parse().map_err(|_| invalid())?;

    let micros = int_val
        .checked_mul(MICROS_PER_UNIT)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(invalid)?;

    Ok(if negative { -micros } else { micros })
}

/// Render micros back to a plain decimal string with trailing zeros trimmed.
pub fn micros_to_string(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let int_part = abs / MICROS_PER_UNIT as u64;
    let frac_part = abs % MICROS_PER_UNIT as u64;
    if frac_part == 0 {
        return format!("{sign}{int_part}");
    }
    let frac = format!("{frac_part:06}");
    format!("{sign}{int_part}.{}", frac.trim_end_matches('0'))
}

// ---------------------------------------------------------------------------
// Date stamps
// ---------------------------------------------------------------------------

/// Whether a stamp carried zone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateConvention {
    Naive,
    Aware,
}

/// A parsed stamp reduced to its calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateStamp {
    pub date: NaiveDate,
    pub convention: DateConvention,
}

/// Parse one date stamp.
///
/// Accepted layouts:
/// - `2024-01-08` and `2024-01-08 09:30:00` / `2024-01-08T09:30:00` (naive)
/// - RFC 3339 or `2024-01-08 00:00:00-05:00` (aware; date taken in the stamp's own offset)
/// - bare epoch seconds (aware; date taken in `exchange_tz`, or UTC when `None`)
pub fn parse_date_stamp(raw: &str, exchange_tz: Option<Tz>) -> Result<DateStamp, NormalizerError> {
    let s = raw.trim();
    let invalid = || NormalizerError::InvalidDate(raw.to_string());
    if s.is_empty() {
        return Err(invalid());
    }

    if s.bytes().all(|c| c.is_ascii_digit()) && s.len() > 8 {
        let secs: i64 = s.parse().map_err(|_| invalid())?;
        let utc = Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid)?;
        let date = match exchange_tz {
            Some(tz) => utc.with_timezone(&tz).date_naive(),
            None => utc.date_naive(),
        };
        return Ok(DateStamp {
            date,
            convention: DateConvention::Aware,
        });
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(DateStamp {
            date,
            convention: DateConvention::Naive,
        });
    }

    let aware = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z"))
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%z"));
    if let Ok(dt) = aware {
        return Ok(DateStamp {
            date: dt.date_naive(),
            convention: DateConvention::Aware,
        });
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| invalid())?;
    Ok(DateStamp {
        date: naive.date(),
        convention: DateConvention::Naive,
    })
}

/// Reject a batch of stamps that mixes conventions.
fn ensure_single_convention(stamps: &[DateStamp]) -> Result<(), NormalizerError> {
    let naive = stamps
        .iter()
        .position(|s| s.convention == DateConvention::Naive);
    let aware = stamps
        .iter()
        .position(|s| s.convention == DateConvention::Aware);
    match (naive, aware) {
        (Some(naive_row), Some(aware_row)) => Err(NormalizerError::MixedDateConvention {
            naive_row,
            aware_row,
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

/// Normalize one price row. The date convention is returned alongside the
/// record so the batch can check for mixing.
pub fn normalize_price_row(
    row: &RawPriceRow,
    exchange_tz: Option<Tz>,
) -> Result<(DateStamp, PriceRecord), NormalizerError> {
    let stamp = parse_date_stamp(&row.date, exchange_tz)?;

    let open_micros = price_to_micros(&row.open, "open")?;
    let high_micros = price_to_micros(&row.high, "high")?;
    let low_micros = price_to_micros(&row.low, "low")?;
    let close_micros = price_to_micros(&row.close, "close")?;

    let volume_s = row.volume.trim();
    let volume: i64 = if volume_s.is_empty() {
        0
    } else {
        volume_s
            .parse()
            .map_err(|_| NormalizerError::InvalidVolume(row.volume.clone()))?
    };

    validate_ohlc(stamp.date, open_micros, high_micros, low_micros, close_micros)?;

    Ok((
        stamp,
        PriceRecord {
            date: stamp.date,
            open_micros,
            high_micros,
            low_micros,
            close_micros,
            volume,
        },
    ))
}

/// Normalize a full price history into a [`PriceSeries`].
///
/// All-or-nothing: the first bad row aborts with its row index attached.
pub fn normalize_prices(
    symbol: &str,
    rows: &[RawPriceRow],
    exchange_tz: Option<Tz>,
) -> Result<PriceSeries, NormalizerError> {
    let mut stamps = Vec::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let (stamp, record) = normalize_price_row(row, exchange_tz).map_err(at_row(i))?;
        stamps.push(stamp);
        records.push(record);
    }
    ensure_single_convention(&stamps)?;

    records.sort_by_key(|r| r.date);
    Ok(PriceSeries::new(symbol, records)?)
}

/// Normalize a dividend history into a [`DividendHistory`].
///
/// Several payments sharing an ex-date (regular plus special) are summed into
/// one event so the table keeps strictly increasing dates.
pub fn normalize_dividends(
    symbol: &str,
    rows: &[RawDividendRow],
    exchange_tz: Option<Tz>,
) -> Result<DividendHistory, NormalizerError> {
    let mut stamps = Vec::with_capacity(rows.len());
    let mut records: Vec<DividendRecord> = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let stamp = parse_date_stamp(&row.date, exchange_tz).map_err(at_row(i))?;
        let amount_micros = price_to_micros(&row.amount, "dividend").map_err(at_row(i))?;
        // Checked per row: merging first would let a bad row hide inside a valid sum.
        if amount_micros <= 0 {
            return Err(at_row(i)(NormalizerError::Series(
                SeriesError::NonPositiveDividend {
                    date: stamp.date,
                    amount_micros,
                },
            )));
        }
        stamps.push(stamp);
        records.push(DividendRecord {
            ex_date: stamp.date,
            amount_micros,
        });
    }
    ensure_single_convention(&stamps)?;

    records.sort_by_key(|r| r.ex_date);
    let mut merged: Vec<DividendRecord> = Vec::with_capacity(records.len());
    for r in records {
        match merged.last_mut() {
            Some(last) if last.ex_date == r.ex_date => last.amount_micros += r.amount_micros,
            _ => merged.push(r),
        }
    }
    Ok(DividendHistory::new(symbol, merged)?)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_ohlc(
    date: NaiveDate,
    open: i64,
    high: i64,
    low: i64,
    close: i64,
) -> Result<(), NormalizerError> {
    let violation = |detail: String| Err(NormalizerError::OhlcViolation { date, detail });
    if low > high {
        return violation(format!("low ({low}) > high ({high})"));
    }
    for (name, v) in [("open", open), ("close", close)] {
        if v < low {
            return violation(format!("{name} ({v}) < low ({low})"));
        }
        if v > high {
            return violation(format!("{name} ({v}) > high ({high})"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn raw(date: &str, open: &str, high: &str, low: &str, close: &str) -> RawPriceRow {
        RawPriceRow {
            date: date.to_string(),
            open: open.to_string(),
            high: high.to_string(),
            low: low.to_string(),
            close: close.to_string(),
            volume: "1000".to_string(),
        }
    }

    fn div(date: &str, amount: &str) -> RawDividendRow {
        RawDividendRow {
            date: date.to_string(),
            amount: amount.to_string(),
        }
    }

    // --- price_to_micros ---

    #[test]
    fn micros_whole_and_fractional() {
        assert_eq!(price_to_micros("100", "open").unwrap(), 100_000_000);
        assert_eq!(price_to_micros("182.34", "open").unwrap(), 182_340_000);
        assert_eq!(price_to_micros("1.123456", "open").unwrap(), 1_123_456);
        assert_eq!(price_to_micros(".5", "open").unwrap(), 500_000);
        assert_eq!(price_to_micros("+0.25", "open").unwrap(), 250_000);
        assert_eq!(price_to_micros("-1.5", "open").unwrap(), -1_500_000);
    }

    #[test]
    fn micros_rejects_seven_decimal_places() {
        let err = price_to_micros("1.1234567", "open").unwrap_err();
        assert!(matches!(err, NormalizerError::TooManyDecimalPlaces { .. }));
    }

    #[test]
    fn micros_rejects_garbage() {
        for s in ["abc", "NaN", "inf", "1.2.3", "1e5", ".", "-"] {
            let err = price_to_micros(s, "open").unwrap_err();
            assert!(
                matches!(err, NormalizerError::InvalidPrice { .. }),
                "expected InvalidPrice for '{s}', got {err:?}"
            );
        }
        assert!(matches!(
            price_to_micros("   ", "open").unwrap_err(),
            NormalizerError::EmptyPrice { .. }
        ));
    }

    #[test]
    fn micros_to_string_trims_zeros() {
        assert_eq!(micros_to_string(10_500_000), "10.5");
        assert_eq!(micros_to_string(11_000_000), "11");
        assert_eq!(micros_to_string(1_123_456), "1.123456");
        assert_eq!(micros_to_string(-250_000), "-0.25");
    }

    // --- date stamps ---

    #[test]
    fn plain_date_is_naive() {
        let s = parse_date_stamp("2024-01-08", None).unwrap();
        assert_eq!(s.date, d(2024, 1, 8));
        assert_eq!(s.convention, DateConvention::Naive);
    }

    #[test]
    fn naive_datetime_keeps_its_date() {
        let s = parse_date_stamp("2024-01-08 23:59:59", None).unwrap();
        assert_eq!(s.date, d(2024, 1, 8));
        assert_eq!(s.convention, DateConvention::Naive);
    }

    #[test]
    fn offset_stamp_uses_its_own_offset() {
        // Midnight in New York is 05:00 UTC the same day; the calendar date stays 2024-01-08.
        let s = parse_date_stamp("2024-01-08 00:00:00-05:00", None).unwrap();
        assert_eq!(s.date, d(2024, 1, 8));
        assert_eq!(s.convention, DateConvention::Aware);

        let s = parse_date_stamp("2024-01-08T00:00:00-05:00", None).unwrap();
        assert_eq!(s.date, d(2024, 1, 8));
    }

    #[test]
    fn epoch_stamp_converted_into_exchange_zone() {
        // 2024-01-08T03:00:00Z is still 2024-01-07 in New York.
        let ts = "1704682800";
        let utc = parse_date_stamp(ts, None).unwrap();
        assert_eq!(utc.date, d(2024, 1, 8));
        let ny = parse_date_stamp(ts, Some(chrono_tz::America::New_York)).unwrap();
        assert_eq!(ny.date, d(2024, 1, 7));
        assert_eq!(ny.convention, DateConvention::Aware);
    }

    #[test]
    fn unrecognised_date_rejected() {
        assert!(matches!(
            parse_date_stamp("08/01/2024", None).unwrap_err(),
            NormalizerError::InvalidDate(_)
        ));
    }

    // --- normalize ---

    #[test]
    fn normalize_prices_sorts_rows() {
        let rows = vec![
            raw("2024-01-09", "10", "11", "9", "10.5"),
            raw("2024-01-08", "10", "10", "10", "10"),
        ];
        let s = normalize_prices("KO", &rows, None).unwrap();
        assert_eq!(s.first_date(), Some(d(2024, 1, 8)));
        assert_eq!(s.records()[1].close_micros, 10_500_000);
    }

    #[test]
    fn normalize_prices_rejects_duplicates() {
        let rows = vec![
            raw("2024-01-08", "10", "10", "10", "10"),
            raw("2024-01-08", "10", "10", "10", "10"),
        ];
        let err = normalize_prices("KO", &rows, None).unwrap_err();
        assert!(matches!(
            err,
            NormalizerError::Series(SeriesError::NotStrictlyIncreasing { .. })
        ));
    }

    #[test]
    fn normalize_prices_rejects_mixed_conventions() {
        let rows = vec![
            raw("2024-01-08", "10", "10", "10", "10"),
            raw("2024-01-09T00:00:00-05:00", "10", "10", "10", "10"),
        ];
        let err = normalize_prices("KO", &rows, None).unwrap_err();
        assert_eq!(
            err,
            NormalizerError::MixedDateConvention {
                naive_row: 0,
                aware_row: 1
            }
        );
    }

    #[test]
    fn normalize_prices_reports_row_of_bad_price() {
        let rows = vec![
            raw("2024-01-08", "10", "10", "10", "10"),
            raw("2024-01-09", "NaN", "10", "10", "10"),
        ];
        let err = normalize_prices("KO", &rows, None).unwrap_err();
        match err {
            NormalizerError::AtRow { row, error } => {
                assert_eq!(row, 1);
                assert!(matches!(
                    *error,
                    NormalizerError::InvalidPrice { field: "open", .. }
                ));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn ohlc_violation_rejected() {
        let rows = vec![raw("2024-01-08", "12", "11", "9", "10")];
        let err = normalize_prices("KO", &rows, None).unwrap_err();
        assert!(err.to_string().contains("OHLC sanity violation"));
    }

    #[test]
    fn empty_volume_reads_as_zero() {
        let mut row = raw("2024-01-08", "10", "10", "10", "10");
        row.volume = String::new();
        let (_, rec) = normalize_price_row(&row, None).unwrap();
        assert_eq!(rec.volume, 0);

        row.volume = "12.5".to_string();
        assert!(matches!(
            normalize_price_row(&row, None).unwrap_err(),
            NormalizerError::InvalidVolume(_)
        ));
    }

    #[test]
    fn same_day_dividends_are_summed() {
        let rows = vec![
            div("2024-03-14", "0.46"),
            div("2023-11-30", "0.46"),
            div("2024-03-14", "0.10"),
        ];
        let h = normalize_dividends("KO", &rows, None).unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h.records()[0].ex_date, d(2023, 11, 30));
        assert_eq!(h.records()[1].amount_micros, 560_000);
    }

    fn non_positive_at_row(err: NormalizerError) -> (usize, i64) {
        match err {
            NormalizerError::AtRow { row, error } => match *error {
                NormalizerError::Series(SeriesError::NonPositiveDividend {
                    amount_micros, ..
                }) => (row, amount_micros),
                other => panic!("unexpected inner error: {other:?}"),
            },
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn zero_dividend_rejected() {
        let err = normalize_dividends("KO", &[div("2024-03-14", "0")], None).unwrap_err();
        assert_eq!(non_positive_at_row(err), (0, 0));
    }

    #[test]
    fn negative_row_is_not_absorbed_by_same_day_payment() {
        let rows = vec![div("2024-01-09", "-0.50"), div("2024-01-09", "1.00")];
        let err = normalize_dividends("KO", &rows, None).unwrap_err();
        assert_eq!(non_positive_at_row(err), (0, -500_000));
    }

    #[test]
    fn zero_row_is_not_absorbed_by_same_day_payment() {
        let rows = vec![div("2024-01-09", "1.00"), div("2024-01-09", "0.00")];
        let err = normalize_dividends("KO", &rows, None).unwrap_err();
        assert_eq!(non_positive_at_row(err), (1, 0));
    }
}
