//! divrec-analysis
//!
//! Dividend recovery analysis: for each dividend event, how many days the
//! price needs to reach targets derived from a pre-dividend reference price.
//!
//! Pipeline per symbol (see [`analyze`]):
//! reference date → targets → forward search → per-event result → aggregation.
//! All computation is synchronous and deterministic. The only side effect is
//! `tracing` output; installing a subscriber is the host's job.

pub mod aggregate;
pub mod analyzer;
pub mod batch;
pub mod error;
pub mod gate;
pub mod reference;
pub mod search;
pub mod table;
pub mod targets;
pub mod types;

pub use aggregate::{aggregate, AggregateBucket, AggregateSummary, BucketKey, FractionStats};
pub use analyzer::analyze;
pub use batch::{analyze_batch, analyze_symbols, BatchError, SymbolInput, SymbolOutcome};
pub use error::{AnalysisError, SearchError};
pub use gate::{evaluate_gate, GateOutcome, YearTotal};
pub use reference::{resolve_reference_date, resolve_reference_record};
pub use search::find_achievement;
pub use table::{
    read_results_csv, read_results_csv_file, write_results_csv, write_results_csv_file,
    TableError,
};
pub use targets::{compute_targets, target_price};
pub use types::{
    default_fractions, Achievement, AggregationRule, AnalysisConfig, AnalysisReport,
    AnalysisStatus, DayCountAnchor, MissingExDatePolicy, RecoveryFraction, RecoveryResult,
    RecoveryTarget, SkipReason, SkippedEvent, TargetMode, TargetOutcome,
};
