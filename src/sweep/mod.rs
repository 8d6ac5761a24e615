//! Typed sweep records and the column classification pass
//!
//! The external record source delivers loosely-typed rows (column name ->
//! value). [`Sweep::from_rows`] performs the single classification pass
//! that turns those into [`TrialRecord`]s with fixed optional role fields
//! plus one ordered hyperparameter mapping, so downstream components never
//! re-inspect raw input. Any column not matching a recognized role becomes
//! a hyperparameter automatically.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::ColumnRoles;
use crate::error::{AnalyzeError, Result};
use crate::stats::fmt_num;

/// A raw input cell, as delivered by the external trial record source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric view: numbers directly, text if it parses as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    fn as_display(&self) -> String {
        match self {
            CellValue::Number(v) => fmt_num(*v),
            CellValue::Text(s) => s.trim().to_string(),
        }
    }
}

/// A raw input row: ordered mapping of column name to cell value.
pub type RawRow = BTreeMap<String, CellValue>;

/// Trial completion status: a small open string-like enumeration.
///
/// The value is normalized (trimmed, lowercased) at construction; unknown
/// tokens are carried through unchanged so the failed-run detector can
/// match them against its configured failure tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialStatus(String);

impl TrialStatus {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_completed(&self) -> bool {
        self.0 == "completed"
    }
}

impl std::fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hyperparameter value: numeric or categorical (missing = key absent).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Numeric(f64),
    Categorical(String),
}

impl ParamValue {
    /// Numeric view, if this value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Numeric(v) => Some(*v),
            ParamValue::Categorical(_) => None,
        }
    }

    /// Display label, used when a mixed column falls back to categorical
    /// bucketing.
    pub fn label(&self) -> String {
        match self {
            ParamValue::Numeric(v) => fmt_num(*v),
            ParamValue::Categorical(s) => s.clone(),
        }
    }
}

/// One trial of the sweep, fully classified.
///
/// Metric and hyperparameter keys need not be identical across records;
/// sparse columns are represented by absent keys. Metric values may be
/// NaN or ±Inf — surfacing those is the analyzer's job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Unique, stable identifier
    pub id: String,
    /// Completion status
    pub status: TrialStatus,
    /// Named numeric outcome metrics
    pub metrics: BTreeMap<String, f64>,
    /// Hyperparameters, auto-discovered from unrecognized columns
    pub hyperparams: BTreeMap<String, ParamValue>,
    /// Epoch count, if recorded
    pub epochs: Option<f64>,
    /// Wall-clock runtime in seconds, if recorded
    pub runtime_sec: Option<f64>,
}

/// A validated, non-empty collection of trials with unique ids.
///
/// Constructing a `Sweep` is the contract boundary: once one exists, the
/// analysis itself cannot fail.
#[derive(Clone, Debug)]
pub struct Sweep {
    trials: Vec<TrialRecord>,
}

impl Sweep {
    /// Validate an already-typed trial collection.
    pub fn new(trials: Vec<TrialRecord>) -> Result<Self> {
        if trials.is_empty() {
            return Err(AnalyzeError::EmptySweep);
        }
        let mut seen = BTreeSet::new();
        for trial in &trials {
            if !seen.insert(trial.id.as_str()) {
                return Err(AnalyzeError::DuplicateTrialId(trial.id.clone()));
            }
        }
        Ok(Self { trials })
    }

    /// Build a sweep from raw rows via the classification pass.
    ///
    /// Fails fast when the collection is empty, when a row lacks the
    /// identifier column, when no row carries the status column, or when
    /// two rows share an id. A row missing an *optional* column simply
    /// yields a record with that field absent.
    pub fn from_rows(rows: Vec<RawRow>, roles: &ColumnRoles) -> Result<Self> {
        if rows.is_empty() {
            return Err(AnalyzeError::EmptySweep);
        }
        let status_seen = rows.iter().any(|row| row.contains_key(&roles.status));
        if !status_seen {
            return Err(AnalyzeError::MissingColumn(roles.status.clone()));
        }

        let mut trials = Vec::with_capacity(rows.len());
        for row in rows {
            trials.push(classify_row(row, roles)?);
        }
        Self::new(trials)
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Always false: emptiness is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Sorted union of hyperparameter names across all trials.
    pub fn param_names(&self) -> Vec<String> {
        let mut names: BTreeSet<&str> = BTreeSet::new();
        for trial in &self.trials {
            names.extend(trial.hyperparams.keys().map(String::as_str));
        }
        names.into_iter().map(str::to_string).collect()
    }
}

/// Classify one raw row into a typed record.
fn classify_row(row: RawRow, roles: &ColumnRoles) -> Result<TrialRecord> {
    let id = row
        .get(&roles.trial_id)
        .map(CellValue::as_display)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnalyzeError::MissingColumn(roles.trial_id.clone()))?;

    let status = row
        .get(&roles.status)
        .map(|cell| TrialStatus::new(&cell.as_display()))
        .unwrap_or_else(|| TrialStatus::new("unknown"));

    let mut metrics = BTreeMap::new();
    let mut hyperparams = BTreeMap::new();
    let mut epochs = None;
    let mut runtime_sec = None;

    for (column, cell) in row {
        if column == roles.trial_id || column == roles.status {
            continue;
        }
        if roles.is_metric(&column) {
            // Non-numeric text in a metric column is treated as missing
            if let Some(v) = cell.as_f64() {
                metrics.insert(column, v);
            }
        } else if column == roles.epochs {
            epochs = cell.as_f64();
        } else if column == roles.runtime {
            runtime_sec = cell.as_f64();
        } else {
            // A column is numeric when its values parse as numbers, so
            // text-encoded numbers classify numerically here.
            let value = match cell {
                CellValue::Number(v) => ParamValue::Numeric(v),
                CellValue::Text(s) => match s.trim().parse::<f64>() {
                    Ok(v) => ParamValue::Numeric(v),
                    Err(_) => ParamValue::Categorical(s.trim().to_string()),
                },
            };
            hyperparams.insert(column, value);
        }
    }

    Ok(TrialRecord {
        id,
        status,
        metrics,
        hyperparams,
        epochs,
        runtime_sec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn num(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_empty_rows_rejected() {
        let err = Sweep::from_rows(vec![], &ColumnRoles::default()).unwrap_err();
        assert!(matches!(err, AnalyzeError::EmptySweep));
    }

    #[test]
    fn test_missing_id_rejected() {
        let rows = vec![row(&[("status", text("completed"))])];
        let err = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap_err();
        assert!(matches!(err, AnalyzeError::MissingColumn(c) if c == "trial_id"));
    }

    #[test]
    fn test_status_column_absent_everywhere_rejected() {
        let rows = vec![
            row(&[("trial_id", num(1.0)), ("lr", num(0.1))]),
            row(&[("trial_id", num(2.0)), ("lr", num(0.2))]),
        ];
        let err = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap_err();
        assert!(matches!(err, AnalyzeError::MissingColumn(c) if c == "status"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let rows = vec![
            row(&[("trial_id", text("a")), ("status", text("completed"))]),
            row(&[("trial_id", text("a")), ("status", text("completed"))]),
        ];
        let err = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap_err();
        assert!(matches!(err, AnalyzeError::DuplicateTrialId(id) if id == "a"));
    }

    #[test]
    fn test_classification_routes_roles() {
        let rows = vec![row(&[
            ("trial_id", num(3.0)),
            ("status", text("Completed")),
            ("train_loss", num(0.2)),
            ("val_loss", num(0.3)),
            ("train_acc", num(0.9)),
            ("epochs", num(10.0)),
            ("runtime_sec", num(120.5)),
            ("lr", num(0.01)),
            ("optimizer", text("adam")),
        ])];
        let sweep = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap();
        let trial = &sweep.trials()[0];

        assert_eq!(trial.id, "3");
        assert!(trial.status.is_completed());
        assert_eq!(trial.metrics.len(), 3);
        assert_eq!(trial.metrics["train_loss"], 0.2);
        assert_eq!(trial.epochs, Some(10.0));
        assert_eq!(trial.runtime_sec, Some(120.5));
        assert_eq!(trial.hyperparams.len(), 2);
        assert_eq!(trial.hyperparams["lr"], ParamValue::Numeric(0.01));
        assert_eq!(
            trial.hyperparams["optimizer"],
            ParamValue::Categorical("adam".to_string())
        );
    }

    #[test]
    fn test_unrecognized_column_becomes_hyperparam() {
        let rows = vec![row(&[
            ("trial_id", text("t1")),
            ("status", text("completed")),
            ("brand_new_knob", num(7.0)),
        ])];
        let sweep = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap();
        assert_eq!(sweep.param_names(), vec!["brand_new_knob".to_string()]);
    }

    #[test]
    fn test_text_encoded_number_classifies_numeric() {
        // An all-text sweep (e.g. a stringly-typed CSV boundary) must still
        // get numeric bucketing for its numeric columns.
        let rows = vec![row(&[
            ("trial_id", text("t1")),
            ("status", text("completed")),
            ("lr", text("0.01")),
            ("weight_decay", text(" 1e-4 ")),
            ("optimizer", text("adam")),
        ])];
        let sweep = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap();
        let trial = &sweep.trials()[0];

        assert_eq!(trial.hyperparams["lr"], ParamValue::Numeric(0.01));
        assert_eq!(trial.hyperparams["weight_decay"], ParamValue::Numeric(1e-4));
        assert_eq!(
            trial.hyperparams["optimizer"],
            ParamValue::Categorical("adam".to_string())
        );
    }

    #[test]
    fn test_row_missing_status_defaults_to_unknown() {
        // Status column exists in the sweep, just not in every row.
        let rows = vec![
            row(&[("trial_id", text("t1")), ("status", text("completed"))]),
            row(&[("trial_id", text("t2"))]),
        ];
        let sweep = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap();
        assert_eq!(sweep.trials()[1].status.as_str(), "unknown");
    }

    #[test]
    fn test_nan_metric_preserved() {
        let rows = vec![row(&[
            ("trial_id", text("t1")),
            ("status", text("failed")),
            ("train_loss", num(f64::NAN)),
        ])];
        let sweep = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap();
        assert!(sweep.trials()[0].metrics["train_loss"].is_nan());
    }

    #[test]
    fn test_textual_metric_treated_as_missing() {
        let rows = vec![row(&[
            ("trial_id", text("t1")),
            ("status", text("completed")),
            ("train_loss", text("n/a")),
        ])];
        let sweep = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap();
        assert!(sweep.trials()[0].metrics.is_empty());
    }

    #[test]
    fn test_param_names_sorted_union() {
        let rows = vec![
            row(&[
                ("trial_id", text("t1")),
                ("status", text("completed")),
                ("momentum", num(0.9)),
            ]),
            row(&[
                ("trial_id", text("t2")),
                ("status", text("completed")),
                ("lr", num(0.1)),
            ]),
        ];
        let sweep = Sweep::from_rows(rows, &ColumnRoles::default()).unwrap();
        assert_eq!(
            sweep.param_names(),
            vec!["lr".to_string(), "momentum".to_string()]
        );
    }

    #[test]
    fn test_status_normalized() {
        assert_eq!(TrialStatus::new("  FAILED ").as_str(), "failed");
        assert!(TrialStatus::new("Completed").is_completed());
    }
}
