use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Failure of a single recovery search. Distinct from a target simply not
/// being met inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchError {
    /// `start > end`.
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// The window holds no price record at all.
    NoDataInRange { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::InvalidRange { start, end } => {
                write!(f, "invalid search range: start {start} is after end {end}")
            }
            SearchError::NoDataInRange { start, end } => {
                write!(f, "no price records between {start} and {end}")
            }
        }
    }
}

impl std::error::Error for SearchError {}

/// Symbol-level failure. A batch isolates these per symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// No reference date can be found because the price series is empty.
    ReferenceDateUnresolved { symbol: String },
    EmptyDividendHistory { symbol: String },
    SymbolMismatch { prices: String, dividends: String },
    InvalidConfig(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::ReferenceDateUnresolved { symbol } => {
                write!(f, "{symbol}: reference date unresolved (empty price series)")
            }
            AnalysisError::EmptyDividendHistory { symbol } => {
                write!(f, "{symbol}: dividend history is empty")
            }
            AnalysisError::SymbolMismatch { prices, dividends } => write!(
                f,
                "symbol mismatch: price series is {prices}, dividend history is {dividends}"
            ),
            AnalysisError::InvalidConfig(msg) => write!(f, "invalid analysis config: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisError {}
