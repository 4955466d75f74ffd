//! Typed settings read from a merged configuration document.
//!
//! ```yaml
//! analysis:
//!   reference_offset_days: 10
//!   search_horizon_days: 90
//!   target_fractions: [0.5, 0.75, 1.0]
//!   aggregation: { kind: fixed_batch, size: 4 }
//! universe:
//!   symbols: [KO, PEP]
//!   exchange_tz: America/New_York
//! ```
//!
//! Missing sections and keys take the [`AnalysisConfig`] defaults.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use divrec_analysis::AnalysisConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::unused::{report_unused_keys, UnusedKeyPolicy};
use crate::{load_layered_yaml, LoadedConfig};

/// Symbols to analyse and the exchange time zone used for epoch stamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Universe {
    pub symbols: Vec<String>,
    pub exchange_tz: Option<String>,
}

impl Universe {
    pub fn exchange_tz(&self) -> Result<Option<Tz>> {
        self.exchange_tz
            .as_deref()
            .map(|s| {
                s.parse::<Tz>()
                    .map_err(|e| anyhow!("invalid exchange_tz {s:?}: {e}"))
            })
            .transpose()
    }

    fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for s in &self.symbols {
            if s.trim().is_empty() {
                bail!("universe.symbols contains an empty symbol");
            }
            if !seen.insert(s.as_str()) {
                bail!("universe.symbols lists {s} more than once");
            }
        }
        self.exchange_tz()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub analysis: AnalysisConfig,
    pub universe: Universe,
    /// Hash of the effective merged document.
    pub config_hash: String,
}

fn section<T: serde::de::DeserializeOwned + Default>(root: &Value, pointer: &str) -> Result<T> {
    match root.pointer(pointer) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone())
            .with_context(|| format!("invalid config section {pointer}")),
    }
}

/// Deserialize, validate and check for unused keys.
pub fn settings_from_loaded(loaded: &LoadedConfig, policy: UnusedKeyPolicy) -> Result<Settings> {
    report_unused_keys(&loaded.config_json, policy)?;

    let analysis: AnalysisConfig = section(&loaded.config_json, "/analysis")?;
    analysis.validate()?;

    let universe: Universe = section(&loaded.config_json, "/universe")?;
    universe.validate()?;

    Ok(Settings {
        analysis,
        universe,
        config_hash: loaded.config_hash.clone(),
    })
}

/// Load layered YAML files and build [`Settings`].
pub fn load_settings<P: AsRef<Path>>(paths: &[P], policy: UnusedKeyPolicy) -> Result<Settings> {
    let loaded = load_layered_yaml(paths)?;
    settings_from_loaded(&loaded, policy)
}
