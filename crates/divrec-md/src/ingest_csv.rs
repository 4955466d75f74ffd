//! CSV ingestion for daily price and dividend history.
//!
//! Read side only: turns CSV text into [`RawPriceRow`] / [`RawDividendRow`]
//! values. Normalization (micros, dates, ordering) is `normalizer.rs`' job.
//!
//! ## History CSV (case-insensitive, order-independent)
//!
//! | Column      | Required | Notes                                           |
//! |-------------|----------|-------------------------------------------------|
//! | `date`      | yes      | Any stamp accepted by `parse_date_stamp`        |
//! | `open`      | yes      | Decimal string                                  |
//! | `high`      | yes      |                                                 |
//! | `low`       | yes      |                                                 |
//! | `close`     | yes      |                                                 |
//! | `volume`    | no       | Integer; empty when absent                      |
//! | `dividends` | no       | Per-share amount paid that day; `0` means none  |
//!
//! The optional `dividends` column matches the shape of provider history
//! exports that carry dividends inline with prices.
//!
//! ## Dividend CSV
//!
//! `date` plus one of `dividend` / `dividends` / `amount`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::normalizer::price_to_micros;
use crate::provider::{RawDividendRow, RawPriceRow};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced by CSV parsing in this module.
#[derive(Debug)]
pub enum CsvIngestError {
    /// File could not be read.
    Io(String),
    /// The CSV reader rejected the input (ragged rows, bad UTF-8).
    Csv(String),
    /// The header row is missing a required column.
    MissingHeader(String),
}

impl fmt::Display for CsvIngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvIngestError::Io(msg) => write!(f, "csv io error: {msg}"),
            CsvIngestError::Csv(msg) => write!(f, "csv format error: {msg}"),
            CsvIngestError::MissingHeader(col) => {
                write!(f, "csv missing required header column: '{col}'")
            }
        }
    }
}

impl std::error::Error for CsvIngestError {}

impl From<csv::Error> for CsvIngestError {
    fn from(e: csv::Error) -> Self {
        CsvIngestError::Csv(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Rows decoded from a history CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedHistory {
    pub prices: Vec<RawPriceRow>,
    /// Only rows whose `dividends` cell is non-zero.
    pub dividends: Vec<RawDividendRow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn parse_history_csv_file(path: &Path) -> Result<ParsedHistory, CsvIngestError> {
    let src = read_file(path)?;
    parse_history_csv_str(&src)
}

/// Parse a history CSV held in memory.
///
/// Blank lines are skipped. Empty input yields an empty result.
pub fn parse_history_csv_str(src: &str) -> Result<ParsedHistory, CsvIngestError> {
    let mut rdr = reader(src);
    let headers = rdr.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Ok(ParsedHistory::default());
    }
    let idx = build_col_index(headers.iter());

    let col_date = require(&idx, &["date", "datetime"])?;
    let col_open = require(&idx, &["open"])?;
    let col_high = require(&idx, &["high"])?;
    let col_low = require(&idx, &["low"])?;
    let col_close = require(&idx, &["close"])?;
    let col_volume = find(&idx, &["volume"]);
    let col_dividends = find(&idx, &["dividends", "dividend"]);

    let mut out = ParsedHistory::default();
    for record in rdr.records() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim().to_string();

        let date = cell(col_date);
        out.prices.push(RawPriceRow {
            date: date.clone(),
            open: cell(col_open),
            high: cell(col_high),
            low: cell(col_low),
            close: cell(col_close),
            volume: col_volume.map(cell).unwrap_or_default(),
        });

        if let Some(c) = col_dividends {
            let amount = cell(c);
            if !is_zero_amount(&amount) {
                out.dividends.push(RawDividendRow { date, amount });
            }
        }
    }
    Ok(out)
}

pub fn parse_dividends_csv_file(path: &Path) -> Result<Vec<RawDividendRow>, CsvIngestError> {
    let src = read_file(path)?;
    parse_dividends_csv_str(&src)
}

/// Parse a dividend-only CSV held in memory.
pub fn parse_dividends_csv_str(src: &str) -> Result<Vec<RawDividendRow>, CsvIngestError> {
    let mut rdr = reader(src);
    let headers = rdr.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Ok(Vec::new());
    }
    let idx = build_col_index(headers.iter());

    let col_date = require(&idx, &["date", "ex_date", "datetime"])?;
    let col_amount = require(&idx, &["dividend", "dividends", "amount"])?;

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record?;
        out.push(RawDividendRow {
            date: record.get(col_date).unwrap_or("").trim().to_string(),
            amount: record.get(col_amount).unwrap_or("").trim().to_string(),
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, CsvIngestError> {
    std::fs::read_to_string(path)
        .map_err(|e| CsvIngestError::Io(format!("read '{}': {e}", path.display())))
}

fn reader(src: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(src.trim_start_matches('\u{feff}').as_bytes())
}

/// Case-insensitive column-name → index map.
fn build_col_index<'a>(headers: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    headers
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect()
}

fn find(idx: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| idx.get(*n).copied())
}

fn require(idx: &HashMap<String, usize>, names: &[&str]) -> Result<usize, CsvIngestError> {
    find(idx, names).ok_or_else(|| CsvIngestError::MissingHeader(names[0].to_string()))
}

/// Empty or numerically zero cells mean "no dividend that day".
/// Unparseable cells are kept so the normalizer reports them.
fn is_zero_amount(s: &str) -> bool {
    s.is_empty() || matches!(price_to_micros(s, "dividends"), Ok(0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
