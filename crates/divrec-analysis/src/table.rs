//! Result table: long-format CSV, one row per (event, target).
//!
//! Columns:
//! `event,ex_date,effective_ex_date,amount_micros,reference_date,`
//! `reference_price_micros,ex_date_price_micros,anchor_date,window_end,`
//! `fraction_micros,target_price_micros,status,achieved_date,day_count`
//!
//! `status` is `achieved` or `not_achieved`; the last two cells are empty for
//! `not_achieved`. Reading rejects rows where status and cells disagree.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Achievement, RecoveryFraction, RecoveryResult, RecoveryTarget, TargetOutcome};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum TableError {
    Csv(csv::Error),
    /// 1-based data line (header excluded).
    StatusMismatch { line: usize },
    InvalidFraction { line: usize, micros: i64 },
    /// Event indices must start at 0 and increase by one.
    EventOutOfOrder { line: usize, event: usize },
    /// Rows of one event disagree on an event-level column.
    InconsistentEvent { line: usize, event: usize },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Csv(e) => write!(f, "csv error: {e}"),
            TableError::StatusMismatch { line } => {
                write!(f, "line {line}: status does not match achieved_date/day_count")
            }
            TableError::InvalidFraction { line, micros } => {
                write!(f, "line {line}: invalid fraction_micros {micros}")
            }
            TableError::EventOutOfOrder { line, event } => {
                write!(f, "line {line}: event index {event} out of order")
            }
            TableError::InconsistentEvent { line, event } => {
                write!(f, "line {line}: rows of event {event} disagree")
            }
        }
    }
}

impl std::error::Error for TableError {}

impl From<csv::Error> for TableError {
    fn from(e: csv::Error) -> Self {
        TableError::Csv(e)
    }
}

// ---------------------------------------------------------------------------
// Row shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RowStatus {
    Achieved,
    NotAchieved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResultRow {
    event: usize,
    ex_date: NaiveDate,
    effective_ex_date: NaiveDate,
    amount_micros: i64,
    reference_date: NaiveDate,
    reference_price_micros: i64,
    ex_date_price_micros: i64,
    anchor_date: NaiveDate,
    window_end: NaiveDate,
    fraction_micros: i64,
    target_price_micros: i64,
    status: RowStatus,
    achieved_date: Option<NaiveDate>,
    day_count: Option<u32>,
}

impl ResultRow {
    fn same_event(&self, r: &RecoveryResult) -> bool {
        self.ex_date == r.ex_date
            && self.effective_ex_date == r.effective_ex_date
            && self.amount_micros == r.amount_micros
            && self.reference_date == r.reference_date
            && self.reference_price_micros == r.reference_price_micros
            && self.ex_date_price_micros == r.ex_date_price_micros
            && self.anchor_date == r.anchor_date
            && self.window_end == r.window_end
    }

    fn outcome(&self, line: usize) -> Result<TargetOutcome, TableError> {
        let fraction = RecoveryFraction::from_micros(self.fraction_micros).ok_or(
            TableError::InvalidFraction {
                line,
                micros: self.fraction_micros,
            },
        )?;
        let achievement = match (self.status, self.achieved_date, self.day_count) {
            (RowStatus::Achieved, Some(date), Some(day_count)) => {
                Achievement::Achieved { date, day_count }
            }
            (RowStatus::NotAchieved, None, None) => Achievement::NotAchieved,
            _ => return Err(TableError::StatusMismatch { line }),
        };
        Ok(TargetOutcome {
            target: RecoveryTarget {
                fraction,
                price_micros: self.target_price_micros,
            },
            achievement,
        })
    }
}

// ---------------------------------------------------------------------------
// Write / read
// ---------------------------------------------------------------------------

pub fn write_results_csv(results: &[RecoveryResult]) -> Result<String, TableError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    for (event, r) in results.iter().enumerate() {
        for o in &r.outcomes {
            let (status, achieved_date, day_count) = match o.achievement {
                Achievement::Achieved { date, day_count } => {
                    (RowStatus::Achieved, Some(date), Some(day_count))
                }
                Achievement::NotAchieved => (RowStatus::NotAchieved, None, None),
            };
            w.serialize(ResultRow {
                event,
                ex_date: r.ex_date,
                effective_ex_date: r.effective_ex_date,
                amount_micros: r.amount_micros,
                reference_date: r.reference_date,
                reference_price_micros: r.reference_price_micros,
                ex_date_price_micros: r.ex_date_price_micros,
                anchor_date: r.anchor_date,
                window_end: r.window_end,
                fraction_micros: o.target.fraction.micros(),
                target_price_micros: o.target.price_micros,
                status,
                achieved_date,
                day_count,
            })?;
        }
    }
    let bytes = w
        .into_inner()
        .map_err(|e| TableError::Csv(csv::Error::from(e.into_error())))?;
    // Every cell is ASCII (dates, integers, enum tags).
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn read_results_csv(src: &str) -> Result<Vec<RecoveryResult>, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(src.as_bytes());

    let mut out: Vec<RecoveryResult> = Vec::new();
    for (i, row) in rdr.deserialize::<ResultRow>().enumerate() {
        let line = i + 1;
        let row = row?;
        let outcome = row.outcome(line)?;

        if row.event + 1 == out.len() {
            let current = out
                .last_mut()
                .ok_or(TableError::EventOutOfOrder { line, event: row.event })?;
            if !row.same_event(current) {
                return Err(TableError::InconsistentEvent {
                    line,
                    event: row.event,
                });
            }
            current.outcomes.push(outcome);
        } else if row.event == out.len() {
            out.push(RecoveryResult {
                ex_date: row.ex_date,
                effective_ex_date: row.effective_ex_date,
                amount_micros: row.amount_micros,
                reference_date: row.reference_date,
                reference_price_micros: row.reference_price_micros,
                ex_date_price_micros: row.ex_date_price_micros,
                anchor_date: row.anchor_date,
                window_end: row.window_end,
                outcomes: vec![outcome],
            });
        } else {
            return Err(TableError::EventOutOfOrder {
                line,
                event: row.event,
            });
        }
    }
    Ok(out)
}

pub fn write_results_csv_file(path: &Path, results: &[RecoveryResult]) -> Result<()> {
    let text = write_results_csv(results).context("encode result table")?;
    fs::write(path, text).with_context(|| format!("write result table: {}", path.display()))
}

pub fn read_results_csv_file(path: &Path) -> Result<Vec<RecoveryResult>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read result table: {}", path.display()))?;
    read_results_csv(&text).with_context(|| format!("decode result table: {}", path.display()))
}
