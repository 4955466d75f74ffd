//! Recovery target prices.

use crate::types::{RecoveryFraction, RecoveryTarget, TargetMode};

const MICROS_PER_UNIT: i128 = 1_000_000;

fn i128_to_i64_clamp(x: i128) -> i64 {
    if x > i64::MAX as i128 {
        i64::MAX
    } else if x < i64::MIN as i128 {
        i64::MIN
    } else {
        x as i64
    }
}

/// Price one target.
///
/// Additive: `reference + dividend × fraction`.
/// Multiplicative: `reference × (1 + fraction)`.
pub fn target_price(
    reference_price_micros: i64,
    dividend_micros: i64,
    fraction: RecoveryFraction,
    mode: TargetMode,
) -> i64 {
    let reference = reference_price_micros as i128;
    let f = fraction.micros() as i128;
    let price = match mode {
        TargetMode::Additive => reference + (dividend_micros as i128 * f) / MICROS_PER_UNIT,
        TargetMode::Multiplicative => reference * (MICROS_PER_UNIT + f) / MICROS_PER_UNIT,
    };
    i128_to_i64_clamp(price)
}

/// One target per fraction, in the order the fractions are given.
pub fn compute_targets(
    reference_price_micros: i64,
    dividend_micros: i64,
    fractions: &[RecoveryFraction],
    mode: TargetMode,
) -> Vec<RecoveryTarget> {
    fractions
        .iter()
        .map(|&fraction| RecoveryTarget {
            fraction,
            price_micros: target_price(reference_price_micros, dividend_micros, fraction, mode),
        })
        .collect()
}
