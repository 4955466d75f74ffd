//! Forward search for the first date each target is met.
//!
//! Every target is resolved independently: once achieved it is never
//! re-evaluated, and two targets may share a date. A target with no crossing
//! inside the window is [`Achievement::NotAchieved`], which is a normal
//! outcome. An empty or inverted window is a [`SearchError`].

use chrono::NaiveDate;
use divrec_md::{PriceField, PriceSeries};

use crate::error::SearchError;
use crate::types::{Achievement, RecoveryTarget, TargetOutcome};

/// Scan records dated in `[start, end]` and resolve each target.
///
/// Day-counts are calendar days from `start`. Outcomes follow `targets` order.
pub fn find_achievement(
    series: &PriceSeries,
    start: NaiveDate,
    end: NaiveDate,
    targets: &[RecoveryTarget],
    price_field: PriceField,
) -> Result<Vec<TargetOutcome>, SearchError> {
    if start > end {
        return Err(SearchError::InvalidRange { start, end });
    }
    let window = series.range(start, end);
    if window.is_empty() {
        return Err(SearchError::NoDataInRange { start, end });
    }

    let mut outcomes: Vec<TargetOutcome> = targets
        .iter()
        .map(|&target| TargetOutcome {
            target,
            achievement: Achievement::NotAchieved,
        })
        .collect();
    let mut pending = outcomes.len();

    for rec in window {
        if pending == 0 {
            break;
        }
        let px = rec.price(price_field);
        for o in outcomes.iter_mut() {
            if o.achievement.is_achieved() || px < o.target.price_micros {
                continue;
            }
            let days = (rec.date - start).num_days();
            o.achievement = Achievement::Achieved {
                date: rec.date,
                day_count: u32::try_from(days).unwrap_or(u32::MAX),
            };
            pending -= 1;
        }
    }

    Ok(outcomes)
}
