//! Validated, immutable daily price and dividend tables.
//!
//! Both tables are constructed once per analysis run and never mutated.
//! Construction enforces the ordering invariant (strictly increasing dates,
//! no duplicates) so every downstream lookup can binary-search.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Price field selector
// ---------------------------------------------------------------------------

/// Which column of a daily record is read as "the price".
///
/// Open and close give materially different recovery dates, so the choice is
/// always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    Close,
}

impl PriceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::Close => "close",
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Invariant violations detected while building a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    EmptySymbol,
    /// `next` is not strictly after `prev` (duplicate or out of order).
    NotStrictlyIncreasing { prev: NaiveDate, next: NaiveDate },
    NegativePrice { date: NaiveDate, field: &'static str },
    NegativeVolume { date: NaiveDate, volume: i64 },
    NonPositiveDividend { date: NaiveDate, amount_micros: i64 },
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::EmptySymbol => write!(f, "symbol must not be empty"),
            SeriesError::NotStrictlyIncreasing { prev, next } => {
                write!(f, "dates must be strictly increasing: {next} follows {prev}")
            }
            SeriesError::NegativePrice { date, field } => {
                write!(f, "negative {field} price on {date}")
            }
            SeriesError::NegativeVolume { date, volume } => {
                write!(f, "volume must be >= 0 on {date}, got {volume}")
            }
            SeriesError::NonPositiveDividend {
                date,
                amount_micros,
            } => {
                write!(
                    f,
                    "dividend amount must be > 0 on {date}, got {amount_micros} micros"
                )
            }
        }
    }
}

impl std::error::Error for SeriesError {}

// ---------------------------------------------------------------------------
// PriceSeries
// ---------------------------------------------------------------------------

/// One trading day. Prices are integer micros (1 unit = 1_000_000 micros).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open_micros: i64,
    pub high_micros: i64,
    pub low_micros: i64,
    pub close_micros: i64,
    pub volume: i64,
}

impl PriceRecord {
    pub fn price(&self, field: PriceField) -> i64 {
        match field {
            PriceField::Open => self.open_micros,
            PriceField::Close => self.close_micros,
        }
    }
}

/// Daily OHLCV history for one symbol, strictly ordered by date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    records: Vec<PriceRecord>,
}

impl PriceSeries {
    /// Build a series, rejecting duplicates, out-of-order dates and negative values.
    ///
    /// Callers with unsorted provider data should go through
    /// [`crate::normalizer::normalize_prices`], which sorts first.
    pub fn new(symbol: impl Into<String>, records: Vec<PriceRecord>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(SeriesError::EmptySymbol);
        }

        for r in &records {
            for (field, v) in [
                ("open", r.open_micros),
                ("high", r.high_micros),
                ("low", r.low_micros),
                ("close", r.close_micros),
            ] {
                if v < 0 {
                    return Err(SeriesError::NegativePrice {
                        date: r.date,
                        field,
                    });
                }
            }
            if r.volume < 0 {
                return Err(SeriesError::NegativeVolume {
                    date: r.date,
                    volume: r.volume,
                });
            }
        }
        ensure_strictly_increasing(records.iter().map(|r| r.date))?;

        Ok(Self { symbol, records })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Record for `date`, or `None` when the series has no observation that day.
    pub fn get(&self, date: NaiveDate) -> Option<&PriceRecord> {
        self.records
            .binary_search_by(|r| r.date.cmp(&date))
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.get(date).is_some()
    }

    /// Records with `start <= date <= end`, in chronological order.
    ///
    /// Returns an empty slice when `start > end`.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> &[PriceRecord] {
        if start > end {
            return &[];
        }
        let lo = self.records.partition_point(|r| r.date < start);
        let hi = self.records.partition_point(|r| r.date <= end);
        &self.records[lo..hi]
    }

    /// Records dated on or before `date`, in chronological order.
    pub fn up_to(&self, date: NaiveDate) -> &[PriceRecord] {
        let hi = self.records.partition_point(|r| r.date <= date);
        &self.records[..hi]
    }
}

// ---------------------------------------------------------------------------
// DividendHistory
// ---------------------------------------------------------------------------

/// One ex-dividend event with its per-share amount in micros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendRecord {
    pub ex_date: NaiveDate,
    pub amount_micros: i64,
}

/// Dividend history for one symbol, strictly ordered by ex-date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DividendHistory {
    symbol: String,
    records: Vec<DividendRecord>,
}

impl DividendHistory {
    pub fn new(
        symbol: impl Into<String>,
        records: Vec<DividendRecord>,
    ) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(SeriesError::EmptySymbol);
        }
        if let Some(bad) = records.iter().find(|r| r.amount_micros <= 0) {
            return Err(SeriesError::NonPositiveDividend {
                date: bad.ex_date,
                amount_micros: bad.amount_micros,
            });
        }
        ensure_strictly_increasing(records.iter().map(|r| r.ex_date))?;

        Ok(Self { symbol, records })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn records(&self) -> &[DividendRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of amounts per calendar year of the ex-date.
    pub fn yearly_totals(&self) -> BTreeMap<i32, i64> {
        let mut out: BTreeMap<i32, i64> = BTreeMap::new();
        for r in &self.records {
            *out.entry(r.ex_date.year()).or_insert(0) += r.amount_micros;
        }
        out
    }
}

fn ensure_strictly_increasing(
    dates: impl Iterator<Item = NaiveDate>,
) -> Result<(), SeriesError> {
    let mut prev: Option<NaiveDate> = None;
    for next in dates {
        if let Some(p) = prev {
            if next <= p {
                return Err(SeriesError::NotStrictlyIncreasing { prev: p, next });
            }
        }
        prev = Some(next);
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

    fn rec(date: NaiveDate, open: i64, close: i64) -> PriceRecord {
        PriceRecord {
            date,
            open_micros: open,
            high_micros: open.max(close),
            low_micros: open.min(close),
            close_micros: close,
            volume: 100,
        }
    }

    fn week() -> PriceSeries {
        // Mon 2024-01-08 .. Fri 2024-01-12
        let recs = (8..=12)
            .map(|day| rec(d(2024, 1, day), day as i64 * 1_000_000, day as i64 * 1_100_000))
            .collect();
        PriceSeries::new("KO", recs).unwrap()
    }

    #[test]
    fn get_returns_none_for_missing_date() {
        let s = week();
        assert!(s.get(d(2024, 1, 13)).is_none());
        assert_eq!(s.get(d(2024, 1, 9)).unwrap().open_micros, 9_000_000);
    }

    #[test]
    fn price_respects_field() {
        let s = week();
        let rec = s.get(d(2024, 1, 10)).unwrap();
        assert_eq!(rec.price(PriceField::Open), 10_000_000);
        assert_eq!(rec.price(PriceField::Close), 11_000_000);
    }

    #[test]
    fn range_is_inclusive_and_handles_inverted_bounds() {
        let s = week();
        let r = s.range(d(2024, 1, 9), d(2024, 1, 11));
        assert_eq!(r.len(), 3);
        assert_eq!(r[0].date, d(2024, 1, 9));
        assert_eq!(r[2].date, d(2024, 1, 11));
        assert!(s.range(d(2024, 1, 11), d(2024, 1, 9)).is_empty());
        assert!(s.range(d(2024, 2, 1), d(2024, 2, 9)).is_empty());
    }

    #[test]
    fn up_to_includes_the_date_itself() {
        let s = week();
        assert_eq!(s.up_to(d(2024, 1, 9)).len(), 2);
        assert!(s.up_to(d(2024, 1, 1)).is_empty());
    }

    #[test]
    fn duplicate_dates_rejected() {
        let recs = vec![rec(d(2024, 1, 8), 1, 1), rec(d(2024, 1, 8), 2, 2)];
        let err = PriceSeries::new("KO", recs).unwrap_err();
        assert!(matches!(err, SeriesError::NotStrictlyIncreasing { .. }));
    }

    #[test]
    fn out_of_order_dates_rejected() {
        let recs = vec![rec(d(2024, 1, 9), 1, 1), rec(d(2024, 1, 8), 2, 2)];
        assert!(PriceSeries::new("KO", recs).is_err());
    }

    #[test]
    fn negative_price_rejected() {
        let mut r = rec(d(2024, 1, 8), 1, 1);
        r.low_micros = -1;
        let err = PriceSeries::new("KO", vec![r]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::NegativePrice {
                date: d(2024, 1, 8),
                field: "low"
            }
        );
    }

    #[test]
    fn empty_series_is_allowed() {
        let s = PriceSeries::new("KO", vec![]).unwrap();
        assert!(s.is_empty());
        assert!(s.first_date().is_none());
    }

    #[test]
    fn blank_symbol_rejected() {
        assert_eq!(
            PriceSeries::new("  ", vec![]).unwrap_err(),
            SeriesError::EmptySymbol
        );
    }

    #[test]
    fn dividend_amount_must_be_positive() {
        let err = DividendHistory::new(
            "KO",
            vec![DividendRecord {
                ex_date: d(2024, 1, 8),
                amount_micros: 0,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, SeriesError::NonPositiveDividend { .. }));
    }

    #[test]
    fn yearly_totals_sum_per_year() {
        let h = DividendHistory::new(
            "KO",
            vec![
                DividendRecord {
                    ex_date: d(2022, 3, 1),
                    amount_micros: 400_000,
                },
                DividendRecord {
                    ex_date: d(2022, 9, 1),
                    amount_micros: 600_000,
                },
                DividendRecord {
                    ex_date: d(2023, 3, 1),
                    amount_micros: 1_200_000,
                },
            ],
        )
        .unwrap();
        let totals = h.yearly_totals();
        assert_eq!(totals.get(&2022), Some(&1_000_000));
        assert_eq!(totals.get(&2023), Some(&1_200_000));
    }

    #[test]
    fn error_display_not_increasing() {
        let e = SeriesError::NotStrictlyIncreasing {
            prev: d(2024, 1, 9),
            next: d(2024, 1, 8),
        };
        assert_eq!(
            e.to_string(),
            "dates must be strictly increasing: 2024-01-08 follows 2024-01-09"
        );
    }
}
