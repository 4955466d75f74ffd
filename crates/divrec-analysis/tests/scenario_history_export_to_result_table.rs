//! History export → analysis → result table on disk → read back.
//!
//! Also runs the same history through the batch runner next to a symbol with
//! no dividends, which must fail alone.

use chrono::NaiveDate;
use divrec_analysis::{
    analyze, analyze_batch, read_results_csv_file, write_results_csv_file, AnalysisConfig,
    AnalysisError, BatchError, SymbolInput,
};
use divrec_md::ingest_csv::parse_history_csv_str;
use divrec_md::normalizer::{normalize_dividends, normalize_prices};
use divrec_md::DividendHistory;

const HISTORY_CSV: &str = include_str!("fixtures/ko_2024_h1.csv");

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn ko() -> SymbolInput {
    let parsed = parse_history_csv_str(HISTORY_CSV).expect("parse fixture");
    SymbolInput {
        prices: normalize_prices("KO", &parsed.prices, None).expect("prices"),
        dividends: normalize_dividends("KO", &parsed.dividends, None).expect("dividends"),
    }
}

#[test]
fn march_dividend_recovers_within_a_week() {
    let input = ko();
    let report = analyze(&input.prices, &input.dividends, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.results.len(), 1);

    let r = &report.results[0];
    assert_eq!(r.ex_date, d(2024, 3, 14));
    assert_eq!(r.reference_date, d(2024, 3, 4));
    assert_eq!(r.reference_price_micros, 60_160_000);
    assert_eq!(r.ex_date_price_micros, 60_880_000);

    let days: Vec<Option<u32>> = r.outcomes.iter().map(|o| o.achievement.day_count()).collect();
    assert_eq!(days, vec![Some(3), Some(4), Some(7)]);
}

#[test]
fn result_table_round_trips_through_a_file() {
    let input = ko();
    let mut cfg = AnalysisConfig::default();
    // Add a target the fixture never reaches so both row states are written.
    cfg.target_fractions
        .push(divrec_analysis::RecoveryFraction::from_micros(20_000_000).unwrap());
    let report = analyze(&input.prices, &input.dividends, &cfg).unwrap();
    assert!(!report.results[0].outcomes[3].achievement.is_achieved());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ko_results.csv");
    write_results_csv_file(&path, &report.results).unwrap();

    let back = read_results_csv_file(&path).unwrap();
    assert_eq!(back, report.results);
}

#[test]
fn batch_isolates_failing_symbol() {
    let good = ko();
    let bare = SymbolInput {
        prices: {
            let parsed = parse_history_csv_str(HISTORY_CSV).unwrap();
            normalize_prices("PEP", &parsed.prices, None).unwrap()
        },
        dividends: DividendHistory::new("PEP", vec![]).unwrap(),
    };

    let out = analyze_batch(&[good, bare], &AnalysisConfig::default());
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].symbol, "KO");
    assert_eq!(out[0].result.as_ref().unwrap().results.len(), 1);
    assert_eq!(out[1].symbol, "PEP");
    assert!(matches!(
        out[1].result,
        Err(BatchError::Analysis(AnalysisError::EmptyDividendHistory { .. }))
    ));
}
