use std::fmt;

use chrono::NaiveDate;
use divrec_md::{micros_to_string, PriceField};
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateSummary;
use crate::error::{AnalysisError, SearchError};
use crate::gate::GateOutcome;

// ---------------------------------------------------------------------------
// Recovery fraction
// ---------------------------------------------------------------------------

/// Share of the dividend (additive mode) or of the reference price
/// (multiplicative mode) a target represents, held as micros (0.5 → 500_000).
///
/// Serialized as a plain number so configuration files read `0.75`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RecoveryFraction {
    micros: i64,
}

impl RecoveryFraction {
    /// `None` unless `micros > 0`.
    pub fn from_micros(micros: i64) -> Option<Self> {
        (micros > 0).then_some(Self { micros })
    }

    pub fn micros(&self) -> i64 {
        self.micros
    }

    pub fn as_f64(&self) -> f64 {
        self.micros as f64 / 1_000_000.0
    }

    /// Percentage label, e.g. `"50%"`, `"12.5%"`.
    pub fn label(&self) -> String {
        format!("{}%", micros_to_string(self.micros.saturating_mul(100)))
    }
}

impl TryFrom<f64> for RecoveryFraction {
    type Error = String;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        if !v.is_finite() {
            return Err(format!("recovery fraction must be finite, got {v}"));
        }
        let micros = (v * 1_000_000.0).round();
        if micros < 1.0 || micros > i64::MAX as f64 {
            return Err(format!("recovery fraction must be > 0, got {v}"));
        }
        Ok(Self {
            micros: micros as i64,
        })
    }
}

impl From<RecoveryFraction> for f64 {
    fn from(f: RecoveryFraction) -> f64 {
        f.as_f64()
    }
}

impl fmt::Display for RecoveryFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How a target price is derived from the reference price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// `reference + dividend × fraction`
    Additive,
    /// `reference × (1 + fraction)`
    Multiplicative,
}

/// What to do when an ex-date has no record in the price series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingExDatePolicy {
    /// Drop the event; it is listed in the report's `skipped` events.
    Skip,
    /// Reuse the ex-date of the most recent earlier event that was present
    /// in the series. Events before any valid ex-date are skipped.
    CarryForwardLastValid,
}

/// Date the search window starts on and day-counts are measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCountAnchor {
    ReferenceDate,
    ExDate,
}

/// Grouping used for the aggregate summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationRule {
    /// Calendar month (1-12) of the ex-date, across years.
    Month,
    /// Calendar year of the ex-date.
    Year,
    /// Sequential batches of `size` events in chronological order.
    FixedBatch { size: usize },
}

/// Every knob of an analysis run. Passed explicitly at call time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Calendar days between the ex-date and the start of the reference walk-back.
    pub reference_offset_days: u32,
    /// Calendar days after the (effective) ex-date the search window extends to.
    pub search_horizon_days: u32,
    /// Target fractions in output order. Must be non-empty and unique.
    pub target_fractions: Vec<RecoveryFraction>,
    pub target_mode: TargetMode,
    pub price_field: PriceField,
    pub missing_exdate_policy: MissingExDatePolicy,
    pub day_count_anchor: DayCountAnchor,
    /// When true, a failed monotonicity gate withholds all results.
    pub require_monotonic_dividends: bool,
    /// Trailing calendar years the monotonicity gate inspects.
    pub monotonic_lookback_years: u32,
    pub aggregation: AggregationRule,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_offset_days: 10,
            search_horizon_days: 90,
            target_fractions: default_fractions(),
            target_mode: TargetMode::Additive,
            price_field: PriceField::Open,
            missing_exdate_policy: MissingExDatePolicy::CarryForwardLastValid,
            day_count_anchor: DayCountAnchor::ReferenceDate,
            require_monotonic_dividends: false,
            monotonic_lookback_years: 10,
            aggregation: AggregationRule::Month,
        }
    }
}

/// 50%, 75% and 100%.
pub fn default_fractions() -> Vec<RecoveryFraction> {
    [500_000, 750_000, 1_000_000]
        .into_iter()
        .filter_map(RecoveryFraction::from_micros)
        .collect()
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.target_fractions.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "target_fractions must not be empty".to_string(),
            ));
        }
        let mut seen = self.target_fractions.clone();
        seen.sort();
        if seen.windows(2).any(|w| w[0] == w[1]) {
            return Err(AnalysisError::InvalidConfig(
                "target_fractions must be unique".to_string(),
            ));
        }
        if let AggregationRule::FixedBatch { size: 0 } = self.aggregation {
            return Err(AnalysisError::InvalidConfig(
                "fixed_batch size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Targets and outcomes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryTarget {
    pub fraction: RecoveryFraction,
    pub price_micros: i64,
}

/// Result of searching for one target. "Not achieved" is its own state and
/// never shares a representation with a day-count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Achievement {
    /// First date in the window the price met the target; `day_count` is the
    /// calendar-day distance from the window start.
    Achieved { date: NaiveDate, day_count: u32 },
    NotAchieved,
}

impl Achievement {
    pub fn is_achieved(&self) -> bool {
        matches!(self, Achievement::Achieved { .. })
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Achievement::Achieved { date, .. } => Some(*date),
            Achievement::NotAchieved => None,
        }
    }

    pub fn day_count(&self) -> Option<u32> {
        match self {
            Achievement::Achieved { day_count, .. } => Some(*day_count),
            Achievement::NotAchieved => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: RecoveryTarget,
    pub achievement: Achievement,
}

// ---------------------------------------------------------------------------
// Per-event result
// ---------------------------------------------------------------------------

/// One analysed dividend event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryResult {
    /// Ex-date as listed in the dividend history.
    pub ex_date: NaiveDate,
    /// Ex-date actually used; differs from `ex_date` only under carry-forward.
    pub effective_ex_date: NaiveDate,
    pub amount_micros: i64,
    pub reference_date: NaiveDate,
    pub reference_price_micros: i64,
    /// Configured price field on `effective_ex_date`.
    pub ex_date_price_micros: i64,
    /// Search window start; day-counts are measured from here.
    pub anchor_date: NaiveDate,
    /// Inclusive search window end.
    pub window_end: NaiveDate,
    /// One entry per configured fraction, in configuration order.
    pub outcomes: Vec<TargetOutcome>,
}

impl RecoveryResult {
    pub fn ex_date_substituted(&self) -> bool {
        self.ex_date != self.effective_ex_date
    }

    pub fn outcome(&self, fraction: RecoveryFraction) -> Option<&TargetOutcome> {
        self.outcomes.iter().find(|o| o.target.fraction == fraction)
    }
}

/// Why an event produced no [`RecoveryResult`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Ex-date absent from the price series under [`MissingExDatePolicy::Skip`].
    ExDateMissing,
    /// Carry-forward found no earlier valid ex-date to reuse.
    NoPriorValidExDate,
    /// The recovery search itself failed.
    Search { error: SearchError },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ExDateMissing => write!(f, "ex-date missing from price series"),
            SkipReason::NoPriorValidExDate => write!(f, "no earlier valid ex-date to carry forward"),
            SkipReason::Search { error } => write!(f, "search failed: {error}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEvent {
    pub ex_date: NaiveDate,
    pub amount_micros: i64,
    pub reason: SkipReason,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    /// The monotonicity gate failed and the configuration required it to pass.
    /// Results and summary are empty.
    DividendsNotIncreasing,
}

/// Everything one symbol's analysis returns. Plain data, no formatting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub status: AnalysisStatus,
    pub gate: GateOutcome,
    pub results: Vec<RecoveryResult>,
    pub skipped: Vec<SkippedEvent>,
    pub summary: AggregateSummary,
}
