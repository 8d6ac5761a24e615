//! Analysis configuration
//!
//! Every threshold the engine uses is a named, overridable field here.
//! The defaults are tunable policy, not contracts: adjusting the
//! overfitting ratio or the bucket count changes what gets flagged, never
//! whether the analysis is well-defined.

use crate::detect::DetectorKind;

/// Column-to-role mapping for the record classification pass.
///
/// Any input column whose name matches none of these roles is treated as a
/// hyperparameter automatically, so new sweep columns require no schema
/// change.
#[derive(Clone, Debug)]
pub struct ColumnRoles {
    /// Unique trial identifier column
    pub trial_id: String,
    /// Trial status column
    pub status: String,
    /// Training-loss metric (primary signal, pairs with `val_loss`)
    pub train_loss: String,
    /// Validation-loss metric (primary signal, pairs with `train_loss`)
    pub val_loss: String,
    /// Additional recognized metric columns (not hyperparameters)
    pub extra_metrics: Vec<String>,
    /// Epoch-count duration column
    pub epochs: String,
    /// Wall-clock duration column
    pub runtime: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            trial_id: "trial_id".to_string(),
            status: "status".to_string(),
            train_loss: "train_loss".to_string(),
            val_loss: "val_loss".to_string(),
            extra_metrics: vec!["train_acc".to_string(), "val_acc".to_string()],
            epochs: "epochs".to_string(),
            runtime: "runtime_sec".to_string(),
        }
    }
}

impl ColumnRoles {
    /// Whether `column` carries one of the recognized special roles
    /// (identifier, status, metric, duration) rather than a hyperparameter.
    pub fn is_reserved(&self, column: &str) -> bool {
        column == self.trial_id
            || column == self.status
            || column == self.epochs
            || column == self.runtime
            || self.is_metric(column)
    }

    /// Whether `column` is a recognized metric column.
    pub fn is_metric(&self, column: &str) -> bool {
        column == self.train_loss
            || column == self.val_loss
            || self.extra_metrics.iter().any(|m| m == column)
    }

    /// Whether `column` is one of the paired loss roles.
    pub fn is_loss(&self, column: &str) -> bool {
        column == self.train_loss || column == self.val_loss
    }
}

/// Configuration for a sweep analysis run
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Column role mapping used when building records from raw rows
    pub roles: ColumnRoles,
    /// Detectors to run, in order
    pub detectors: Vec<DetectorKind>,
    /// Status tokens that mark a trial as failed (compared lowercased)
    pub failure_statuses: Vec<String>,
    /// val_loss / train_loss ratio at which a trial is overfitting-suspect
    pub overfit_ratio_threshold: f64,
    /// Ratio at which an overfitting issue escalates from Medium to High
    pub overfit_high_ratio: f64,
    /// Duration quantile at or below which a run counts as short,
    /// recomputed per sweep and per duration signal
    pub short_run_quantile: f64,
    /// Number of quantile buckets for numeric hyperparameters
    pub bucket_count: usize,
    /// Maximum example trial ids attached to buckets and issue groups
    pub example_cap: usize,
    /// Number of ranked findings surfaced in the summary
    pub top_k_findings: usize,
    /// Minimum issue rate for a second finding on the same hyperparameter
    pub second_finding_min_rate: f64,
    /// Minimum support for a second finding on the same hyperparameter
    pub second_finding_min_support: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            roles: ColumnRoles::default(),
            detectors: DetectorKind::all().to_vec(),
            failure_statuses: vec!["failed".to_string(), "crashed".to_string()],
            overfit_ratio_threshold: 1.5,
            overfit_high_ratio: 2.0,
            short_run_quantile: 0.10,
            bucket_count: 4,
            example_cap: 5,
            top_k_findings: 5,
            second_finding_min_rate: 0.5,
            second_finding_min_support: 2,
        }
    }
}
