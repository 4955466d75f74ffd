//! Unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes. A leaf under any consumed
//! prefix is consumed; every other leaf is reported as unused. A misspelled
//! option therefore shows up here instead of silently falling back to its
//! default.
//!
//! - "/analysis/aggregation" consumes "/analysis/aggregation/kind"
//! - "/analysis/target_fractions" consumes "/analysis/target_fractions/0"

use anyhow::{bail, Result};
use divrec_analysis::AnalysisConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Consumed JSON-pointer prefixes (sorted, unique).
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers, sorted by their escaped pointer text.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

const UNIVERSE_POINTERS: &[&str] = &["/universe/symbols", "/universe/exchange_tz"];

/// Every pointer the settings loader reads: one per [`AnalysisConfig`] field
/// under `/analysis`, plus the universe keys.
pub fn consumed_pointers() -> Vec<String> {
    let mut out: BTreeSet<String> = UNIVERSE_POINTERS.iter().map(|p| p.to_string()).collect();
    if let Ok(Value::Object(fields)) = serde_json::to_value(AnalysisConfig::default()) {
        for k in fields.keys() {
            out.insert(format!("/analysis/{}", escape_pointer_token(k)));
        }
    }
    out.into_iter().collect()
}

/// Produce an unused-key report.
/// `Fail` returns an error when unused keys exist; `Warn` logs them and
/// always returns the report.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed_prefixes = consumed_pointers();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if !report.is_clean() {
        match policy {
            UnusedKeyPolicy::Fail => bail!(
                "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
                Remove or fix them. First few: {}",
                report.unused_leaf_pointers.len(),
                preview_list(&report.unused_leaf_pointers, 12)
            ),
            UnusedKeyPolicy::Warn => warn!(
                count = report.unused_leaf_pointers.len(),
                first = %preview_list(&report.unused_leaf_pointers, 12),
                "unused config keys"
            ),
        }
    }

    Ok(report)
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc". "/" consumes everything.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn preview_list(items: &[String], n: usize) -> String {
    let take = items.iter().take(n).cloned().collect::<Vec<_>>();
    format!("{:?}", take)
}
