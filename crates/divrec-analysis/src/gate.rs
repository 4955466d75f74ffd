//! Dividend monotonicity gate.
//!
//! Yearly dividend totals over a trailing window of calendar years must be
//! strictly increasing. The window ends at the year of the last dividend and
//! never starts before the year of the first one. Years inside the window with
//! no dividend count as zero.

use divrec_md::DividendHistory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearTotal {
    pub year: i32,
    pub total_micros: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GateOutcome {
    Increasing { yearly_totals: Vec<YearTotal> },
    NotIncreasing { yearly_totals: Vec<YearTotal> },
}

impl GateOutcome {
    pub fn is_increasing(&self) -> bool {
        matches!(self, GateOutcome::Increasing { .. })
    }

    pub fn yearly_totals(&self) -> &[YearTotal] {
        match self {
            GateOutcome::Increasing { yearly_totals }
            | GateOutcome::NotIncreasing { yearly_totals } => yearly_totals,
        }
    }
}

/// Totals for each year of the trailing window, oldest first.
pub fn trailing_yearly_totals(history: &DividendHistory, lookback_years: u32) -> Vec<YearTotal> {
    let totals = history.yearly_totals();
    let (Some((&first_year, _)), Some((&last_year, _))) =
        (totals.first_key_value(), totals.last_key_value())
    else {
        return Vec::new();
    };
    if lookback_years == 0 {
        return Vec::new();
    }

    let span = i32::try_from(lookback_years - 1).unwrap_or(i32::MAX);
    let from = last_year.saturating_sub(span).max(first_year);
    (from..=last_year)
        .map(|year| YearTotal {
            year,
            total_micros: totals.get(&year).copied().unwrap_or(0),
        })
        .collect()
}

/// `true` for fewer than two values.
pub fn is_strictly_increasing(values: &[i64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

pub fn evaluate_gate(history: &DividendHistory, lookback_years: u32) -> GateOutcome {
    let yearly_totals = trailing_yearly_totals(history, lookback_years);
    let values: Vec<i64> = yearly_totals.iter().map(|y| y.total_micros).collect();
    if is_strictly_increasing(&values) {
        GateOutcome::Increasing { yearly_totals }
    } else {
        GateOutcome::NotIncreasing { yearly_totals }
    }
}
