//! Per-symbol dividend recovery analysis.
//!
//! Events are processed strictly in ex-date order:
//! 1. apply the missing-ex-date policy
//! 2. resolve the reference date and read reference / ex-date prices
//! 3. price the targets
//! 4. search the window `[anchor, effective ex-date + horizon]`
//!
//! Search failures skip only the event they belong to. The monotonicity gate
//! runs first and either blocks the whole symbol or is attached as a warning.

use chrono::{Days, NaiveDate};
use divrec_md::{DividendHistory, DividendRecord, PriceRecord, PriceSeries};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, AggregateSummary};
use crate::error::{AnalysisError, SearchError};
use crate::gate::evaluate_gate;
use crate::reference::resolve_reference_record;
use crate::search::find_achievement;
use crate::targets::compute_targets;
use crate::types::{
    AnalysisConfig, AnalysisReport, AnalysisStatus, DayCountAnchor, MissingExDatePolicy,
    RecoveryResult, SkipReason, SkippedEvent,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Analyse every dividend event of one symbol.
///
/// Fails only on symbol-level problems (bad config, mismatched tables, empty
/// inputs). Per-event problems land in [`AnalysisReport::skipped`].
pub fn analyze(
    series: &PriceSeries,
    dividends: &DividendHistory,
    cfg: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    cfg.validate()?;
    let symbol = series.symbol();
    if symbol != dividends.symbol() {
        return Err(AnalysisError::SymbolMismatch {
            prices: symbol.to_string(),
            dividends: dividends.symbol().to_string(),
        });
    }
    if series.is_empty() {
        return Err(AnalysisError::ReferenceDateUnresolved {
            symbol: symbol.to_string(),
        });
    }
    if dividends.is_empty() {
        return Err(AnalysisError::EmptyDividendHistory {
            symbol: symbol.to_string(),
        });
    }

    let gate = evaluate_gate(dividends, cfg.monotonic_lookback_years);
    if !gate.is_increasing() {
        if cfg.require_monotonic_dividends {
            warn!(symbol, "dividends not increasing; analysis withheld");
            return Ok(AnalysisReport {
                symbol: symbol.to_string(),
                status: AnalysisStatus::DividendsNotIncreasing,
                gate,
                results: Vec::new(),
                skipped: Vec::new(),
                summary: AggregateSummary::empty(cfg.aggregation),
            });
        }
        warn!(symbol, "dividends not increasing; continuing");
    }

    let mut results = Vec::with_capacity(dividends.len());
    let mut skipped = Vec::new();
    let mut last_valid: Option<&PriceRecord> = None;

    for event in dividends.records() {
        let ex_record = match series.get(event.ex_date) {
            Some(rec) => {
                last_valid = Some(rec);
                rec
            }
            None => match (cfg.missing_exdate_policy, last_valid) {
                (MissingExDatePolicy::CarryForwardLastValid, Some(prev)) => {
                    debug!(
                        symbol,
                        ex_date = %event.ex_date,
                        substitute = %prev.date,
                        "ex-date missing; carrying forward"
                    );
                    prev
                }
                (policy, _) => {
                    let reason = match policy {
                        MissingExDatePolicy::Skip => SkipReason::ExDateMissing,
                        MissingExDatePolicy::CarryForwardLastValid => {
                            SkipReason::NoPriorValidExDate
                        }
                    };
                    warn!(symbol, ex_date = %event.ex_date, %reason, "event skipped");
                    skipped.push(SkippedEvent {
                        ex_date: event.ex_date,
                        amount_micros: event.amount_micros,
                        reason,
                    });
                    continue;
                }
            },
        };

        let reference = resolve_reference_record(series, ex_record.date, cfg.reference_offset_days)?;

        match evaluate_event(series, event, ex_record, reference, cfg) {
            Ok(result) => results.push(result),
            Err(error) => {
                warn!(symbol, ex_date = %event.ex_date, %error, "event skipped");
                skipped.push(SkippedEvent {
                    ex_date: event.ex_date,
                    amount_micros: event.amount_micros,
                    reason: SkipReason::Search { error },
                });
            }
        }
    }

    let summary = aggregate(&results, &cfg.target_fractions, cfg.aggregation);
    info!(
        symbol,
        events = dividends.len(),
        analysed = results.len(),
        skipped = skipped.len(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        symbol: symbol.to_string(),
        status: AnalysisStatus::Completed,
        gate,
        results,
        skipped,
        summary,
    })
}

// ---------------------------------------------------------------------------
// One event
// ---------------------------------------------------------------------------

fn evaluate_event(
    series: &PriceSeries,
    event: &DividendRecord,
    ex_record: &PriceRecord,
    reference: &PriceRecord,
    cfg: &AnalysisConfig,
) -> Result<RecoveryResult, SearchError> {
    let reference_price = reference.price(cfg.price_field);
    let targets = compute_targets(
        reference_price,
        event.amount_micros,
        &cfg.target_fractions,
        cfg.target_mode,
    );

    let anchor = match cfg.day_count_anchor {
        DayCountAnchor::ReferenceDate => reference.date,
        DayCountAnchor::ExDate => ex_record.date,
    };
    let window_end = horizon_end(ex_record.date, cfg.search_horizon_days);

    let outcomes = find_achievement(series, anchor, window_end, &targets, cfg.price_field)?;
    debug!(
        ex_date = %event.ex_date,
        reference_date = %reference.date,
        achieved = outcomes.iter().filter(|o| o.achievement.is_achieved()).count(),
        "event analysed"
    );

    Ok(RecoveryResult {
        ex_date: event.ex_date,
        effective_ex_date: ex_record.date,
        amount_micros: event.amount_micros,
        reference_date: reference.date,
        reference_price_micros: reference_price,
        ex_date_price_micros: ex_record.price(cfg.price_field),
        anchor_date: anchor,
        window_end,
        outcomes,
    })
}

fn horizon_end(ex_date: NaiveDate, horizon_days: u32) -> NaiveDate {
    ex_date
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .unwrap_or(NaiveDate::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
