//! divrec-md
//!
//! Market-data boundary for dividend-recovery analysis.
//!
//! This crate owns the raw row types handed over by an acquisition
//! collaborator, their deterministic normalization into immutable
//! [`PriceSeries`] / [`DividendHistory`] tables, CSV ingest, the weekday
//! calendar and a data-quality report. It performs no network IO.

pub mod calendar;
pub mod ingest_csv;
pub mod normalizer;
pub mod provider;
pub mod quality;
pub mod series;

use anyhow::{Context, Result};
use chrono_tz::Tz;

pub use calendar::{is_business_day, weekdays_between};
pub use normalizer::{micros_to_string, price_to_micros, NormalizerError};
pub use provider::{HistorySource, InMemorySource, RawDividendRow, RawPriceRow, SourceError};
pub use quality::{build_quality_report, QualityReport};
pub use series::{
    DividendHistory, DividendRecord, PriceField, PriceRecord, PriceSeries, SeriesError,
};

/// Fetch and normalize one symbol's history from `source`.
///
/// `exchange_tz` is only consulted for epoch-second stamps.
pub fn load_symbol(
    source: &dyn HistorySource,
    symbol: &str,
    exchange_tz: Option<Tz>,
) -> Result<(PriceSeries, DividendHistory)> {
    let price_rows = source
        .fetch_prices(symbol)
        .with_context(|| format!("{}: fetch prices for {symbol}", source.name()))?;
    let dividend_rows = source
        .fetch_dividends(symbol)
        .with_context(|| format!("{}: fetch dividends for {symbol}", source.name()))?;

    let prices = normalizer::normalize_prices(symbol, &price_rows, exchange_tz)
        .with_context(|| format!("normalize prices for {symbol}"))?;
    let dividends = normalizer::normalize_dividends(symbol, &dividend_rows, exchange_tz)
        .with_context(|| format!("normalize dividends for {symbol}"))?;
    Ok((prices, dividends))
}

// -----------------
// Tests (no network)
// -----------------
