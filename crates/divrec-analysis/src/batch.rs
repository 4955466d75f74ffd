//! Multi-symbol batch analysis.
//!
//! Symbols are independent: each runs on the rayon pool with its own inputs
//! and a shared read-only config. Output order equals input order and a
//! failing symbol never affects the others.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono_tz::Tz;
use divrec_md::{load_symbol, DividendHistory, HistorySource, PriceSeries};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::analyzer::analyze;
use crate::error::AnalysisError;
use crate::types::{AnalysisConfig, AnalysisReport};

/// Validated tables for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolInput {
    pub prices: PriceSeries,
    pub dividends: DividendHistory,
}

impl SymbolInput {
    pub fn symbol(&self) -> &str {
        self.prices.symbol()
    }
}

#[derive(Debug)]
pub enum BatchError {
    /// Fetching or normalizing the symbol's history failed.
    Load(String),
    Analysis(AnalysisError),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Load(msg) => write!(f, "load failed: {msg}"),
            BatchError::Analysis(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BatchError {}

impl From<AnalysisError> for BatchError {
    fn from(e: AnalysisError) -> Self {
        BatchError::Analysis(e)
    }
}

#[derive(Debug)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub result: Result<AnalysisReport, BatchError>,
}

impl SymbolOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Analyse already-built tables in parallel.
pub fn analyze_batch(inputs: &[SymbolInput], cfg: &AnalysisConfig) -> Vec<SymbolOutcome> {
    let total = inputs.len();
    let done = AtomicUsize::new(0);

    let outcomes: Vec<SymbolOutcome> = inputs
        .par_iter()
        .map(|input| {
            let result = analyze(&input.prices, &input.dividends, cfg).map_err(BatchError::from);
            finish(input.symbol(), result, &done, total)
        })
        .collect();

    log_batch_summary(&outcomes);
    outcomes
}

/// Load each symbol from `source` and analyse it, in parallel.
///
/// `exchange_tz` is forwarded to normalization for epoch-second stamps.
pub fn analyze_symbols(
    source: &dyn HistorySource,
    symbols: &[String],
    exchange_tz: Option<Tz>,
    cfg: &AnalysisConfig,
) -> Vec<SymbolOutcome> {
    let total = symbols.len();
    let done = AtomicUsize::new(0);

    let outcomes: Vec<SymbolOutcome> = symbols
        .par_iter()
        .map(|symbol| {
            let result = load_symbol(source, symbol, exchange_tz)
                .map_err(|e| BatchError::Load(format!("{e:#}")))
                .and_then(|(prices, dividends)| {
                    analyze(&prices, &dividends, cfg).map_err(BatchError::from)
                });
            finish(symbol, result, &done, total)
        })
        .collect();

    log_batch_summary(&outcomes);
    outcomes
}

fn finish(
    symbol: &str,
    result: Result<AnalysisReport, BatchError>,
    done: &AtomicUsize,
    total: usize,
) -> SymbolOutcome {
    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
    match &result {
        Ok(_) => info!(symbol, done = n, total, "symbol analysed"),
        Err(error) => warn!(symbol, done = n, total, %error, "symbol failed"),
    }
    SymbolOutcome {
        symbol: symbol.to_string(),
        result,
    }
}

fn log_batch_summary(outcomes: &[SymbolOutcome]) {
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(symbols = outcomes.len(), failed, "batch complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use divrec_md::{DividendRecord, InMemorySource, PriceRecord, RawDividendRow, RawPriceRow};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn input(symbol: &str, with_dividend: bool) -> SymbolInput {
        let prices = PriceSeries::new(
            symbol,
            (8..=12)
                .map(|day| PriceRecord {
                    date: d(2024, 1, day),
                    open_micros: 10_000_000 + i64::from(day) * 100_000,
                    high_micros: 11_000_000,
                    low_micros: 9_000_000,
                    close_micros: 10_000_000,
                    volume: 1,
                })
                .collect(),
        )
        .unwrap();
        let records = if with_dividend {
            vec![DividendRecord {
                ex_date: d(2024, 1, 9),
                amount_micros: 100_000,
            }]
        } else {
            vec![]
        };
        SymbolInput {
            prices,
            dividends: DividendHistory::new(symbol, records).unwrap(),
        }
    }

    #[test]
    fn order_preserved_and_failures_isolated() {
        let inputs = vec![input("AAA", true), input("BBB", false), input("CCC", true)];
        let out = analyze_batch(&inputs, &AnalysisConfig::default());
        let names: Vec<&str> = out.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(names, vec!["AAA", "BBB", "CCC"]);
        assert!(out[0].is_ok());
        assert!(matches!(
            out[1].result,
            Err(BatchError::Analysis(AnalysisError::EmptyDividendHistory { .. }))
        ));
        assert!(out[2].is_ok());
    }

    #[test]
    fn batch_matches_single_symbol_runs() {
        let inputs = vec![input("AAA", true), input("CCC", true)];
        let cfg = AnalysisConfig::default();
        let out = analyze_batch(&inputs, &cfg);
        for (o, i) in out.iter().zip(&inputs) {
            let single = analyze(&i.prices, &i.dividends, &cfg).unwrap();
            assert_eq!(o.result.as_ref().unwrap(), &single);
        }
    }

    #[test]
    fn source_load_failure_is_isolated() {
        let mut src = InMemorySource::new();
        src.insert(
            "KO",
            (8..=12)
                .map(|day| RawPriceRow {
                    date: format!("2024-01-{day:02}"),
                    open: "60".to_string(),
                    high: "61".to_string(),
                    low: "59".to_string(),
                    close: "60".to_string(),
                    volume: "100".to_string(),
                })
                .collect(),
            vec![RawDividendRow {
                date: "2024-01-09".to_string(),
                amount: "0.5".to_string(),
            }],
        );
        let symbols = vec!["KO".to_string(), "MISSING".to_string()];
        let out = analyze_symbols(&src, &symbols, None, &AnalysisConfig::default());
        assert!(out[0].is_ok());
        match &out[1].result {
            Err(BatchError::Load(msg)) => assert!(msg.contains("MISSING")),
            other => panic!("expected load error, got {other:?}"),
        }
    }
}
