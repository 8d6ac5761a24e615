//! Diagnosticar: hyperparameter sweep pathology analysis
//!
//! Ingests per-trial records from a hyperparameter sweep and produces one
//! structured, serializable diagnostic summary: which trials are
//! pathological (diverged, overfit, crashed, truncated) and which
//! hyperparameter ranges are statistically associated with each pathology.
//!
//! # Architecture
//!
//! - [`sweep`]: typed trial records and the classification pass that turns
//!   raw rows into them (unrecognized columns become hyperparameters)
//! - [`detect`]: the detector suite, one pure function per pathology class
//! - [`correlate`]: quantile bucketing and per-bucket issue-rate estimation
//! - [`summary`]: aggregation into the outward [`SweepSummary`]
//! - [`config`]: every threshold as a named, overridable field
//!
//! The pipeline is synchronous, single-threaded, and deterministic:
//! analyzing the same input twice yields byte-identical serialized output.
//! Data loading, report rendering, and any LLM interpretation happen
//! outside this crate, before or after the one analysis call.
//!
//! # Example
//!
//! ```
//! use diagnosticar::{CellValue, RawRow, SweepAnalyzer};
//!
//! # fn main() -> Result<(), diagnosticar::AnalyzeError> {
//! let mut row = RawRow::new();
//! row.insert("trial_id".into(), CellValue::Text("t1".into()));
//! row.insert("status".into(), CellValue::Text("completed".into()));
//! row.insert("train_loss".into(), CellValue::Number(0.2));
//! row.insert("val_loss".into(), CellValue::Number(0.9));
//! row.insert("lr".into(), CellValue::Number(0.01));
//!
//! let analyzer = SweepAnalyzer::default();
//! let summary = analyzer.analyze_rows(vec![row])?;
//!
//! // val/train ratio 4.5 -> overfitting suspect
//! assert_eq!(summary.total_issues, 1);
//! assert_eq!(summary.trials_with_issues, 1);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod config;
pub mod correlate;
pub mod detect;
pub mod error;
mod stats;
pub mod summary;
pub mod sweep;

pub use analyzer::SweepAnalyzer;
pub use config::{AnalysisConfig, ColumnRoles};
pub use correlate::{Bucket, ParamCorrelation};
pub use detect::{DetectorKind, Issue, IssueType, Severity};
pub use error::{AnalyzeError, Result};
pub use summary::{IssueTypeSummary, SweepSummary};
pub use sweep::{CellValue, ParamValue, RawRow, Sweep, TrialRecord, TrialStatus};
