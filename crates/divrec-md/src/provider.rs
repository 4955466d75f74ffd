//! Provider boundary for daily price and dividend history.
//!
//! This module defines **only** the raw row types and the source trait that
//! an external acquisition collaborator implements. No network code, no CSV
//! logic, no normalization and no quality checks belong here.

use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// A single daily price observation as handed over by a data provider.
///
/// Everything stays a string so the normalizer can apply deterministic
/// conversion rules (integer micros, one date convention per series).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPriceRow {
    /// Date stamp exactly as supplied (`2024-01-08`, `2024-01-08T00:00:00-05:00`,
    /// `2024-01-08 00:00:00` or epoch seconds).
    pub date: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    /// Volume as an integer string; empty means unknown and is read as 0.
    pub volume: String,
}

/// A single dividend observation: ex-dividend date stamp and per-share amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDividendRow {
    pub date: String,
    pub amount: String,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`HistorySource`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source has nothing for this symbol.
    UnknownSymbol(String),
    /// Transport or upstream failure, passed through as text.
    Upstream(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::UnknownSymbol(sym) => write!(f, "no history for symbol '{sym}'"),
            SourceError::Upstream(msg) => write!(f, "upstream error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Upstream history contract.
///
/// Object-safe so callers can hold a `&dyn HistorySource`; `Send + Sync` so a
/// single source can feed a parallel multi-symbol batch.
pub trait HistorySource: Send + Sync {
    /// Human-readable name identifying this source.
    fn name(&self) -> &'static str;

    /// Daily price rows for `symbol`, in whatever order the upstream returns.
    fn fetch_prices(&self, symbol: &str) -> Result<Vec<RawPriceRow>, SourceError>;

    /// Dividend rows for `symbol`. Symbols that never paid return an empty `Vec`.
    fn fetch_dividends(&self, symbol: &str) -> Result<Vec<RawDividendRow>, SourceError>;
}

/// History already held in memory (fixtures, pre-fetched snapshots).
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    prices: BTreeMap<String, Vec<RawPriceRow>>,
    dividends: BTreeMap<String, Vec<RawDividendRow>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        symbol: impl Into<String>,
        prices: Vec<RawPriceRow>,
        dividends: Vec<RawDividendRow>,
    ) {
        let symbol = symbol.into();
        self.prices.insert(symbol.clone(), prices);
        self.dividends.insert(symbol, dividends);
    }
}

impl HistorySource for InMemorySource {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn fetch_prices(&self, symbol: &str) -> Result<Vec<RawPriceRow>, SourceError> {
        self.prices
            .get(symbol)
            .cloned()
            .ok_or_else(|| SourceError::UnknownSymbol(symbol.to_string()))
    }

    fn fetch_dividends(&self, symbol: &str) -> Result<Vec<RawDividendRow>, SourceError> {
        self.dividends
            .get(symbol)
            .cloned()
            .ok_or_else(|| SourceError::UnknownSymbol(symbol.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
