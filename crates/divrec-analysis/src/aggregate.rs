//! Periodic aggregation of recovery day-counts.
//!
//! Means are taken over achieved events only. Not-achieved events are
//! counted per fraction and excluded from the mean; a bucket where nothing
//! was achieved has no mean.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::types::{AggregationRule, RecoveryFraction, RecoveryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BucketKey {
    /// Calendar month of the ex-date, 1-12.
    Month(u32),
    Year(i32),
    /// Zero-based index of a fixed-size batch.
    Batch(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractionStats {
    pub fraction: RecoveryFraction,
    pub achieved_count: usize,
    pub not_achieved_count: usize,
    pub mean_day_count: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
    pub key: BucketKey,
    pub event_count: usize,
    /// One entry per configured fraction, in configuration order.
    pub stats: Vec<FractionStats>,
}

impl AggregateBucket {
    pub fn stats_for(&self, fraction: RecoveryFraction) -> Option<&FractionStats> {
        self.stats.iter().find(|s| s.fraction == fraction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub rule: AggregationRule,
    /// Sorted by key.
    pub buckets: Vec<AggregateBucket>,
}

impl AggregateSummary {
    pub fn empty(rule: AggregationRule) -> Self {
        Self {
            rule,
            buckets: Vec::new(),
        }
    }

    pub fn bucket(&self, key: BucketKey) -> Option<&AggregateBucket> {
        self.buckets.iter().find(|b| b.key == key)
    }
}

fn bucket_key(rule: AggregationRule, index: usize, result: &RecoveryResult) -> BucketKey {
    match rule {
        AggregationRule::Month => BucketKey::Month(result.ex_date.month()),
        AggregationRule::Year => BucketKey::Year(result.ex_date.year()),
        AggregationRule::FixedBatch { size } => BucketKey::Batch(index / size.max(1)),
    }
}

/// Group `results` (chronological) by `rule` and summarise each fraction.
pub fn aggregate(
    results: &[RecoveryResult],
    fractions: &[RecoveryFraction],
    rule: AggregationRule,
) -> AggregateSummary {
    let mut groups: BTreeMap<BucketKey, Vec<&RecoveryResult>> = BTreeMap::new();
    for (i, r) in results.iter().enumerate() {
        groups.entry(bucket_key(rule, i, r)).or_default().push(r);
    }

    let buckets = groups
        .into_iter()
        .map(|(key, members)| AggregateBucket {
            key,
            event_count: members.len(),
            stats: fractions
                .iter()
                .map(|&f| fraction_stats(f, &members))
                .collect(),
        })
        .collect();

    AggregateSummary { rule, buckets }
}

fn fraction_stats(fraction: RecoveryFraction, members: &[&RecoveryResult]) -> FractionStats {
    let mut achieved: Vec<u32> = Vec::new();
    let mut not_achieved = 0usize;
    for r in members {
        match r.outcome(fraction).and_then(|o| o.achievement.day_count()) {
            Some(days) => achieved.push(days),
            None => not_achieved += 1,
        }
    }
    let mean_day_count = (!achieved.is_empty()).then(|| {
        let sum: u64 = achieved.iter().map(|&d| u64::from(d)).sum();
        sum as f64 / achieved.len() as f64
    });
    FractionStats {
        fraction,
        achieved_count: achieved.len(),
        not_achieved_count: not_achieved,
        mean_day_count,
    }
}
