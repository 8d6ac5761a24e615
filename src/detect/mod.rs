//! Pathology detectors
//!
//! Each detector is a pure, total function over the sweep: it emits zero
//! or more [`Issue`]s and never fails for a structurally valid record. A
//! trial missing the columns a detector needs is silently skipped for that
//! detector only.
//!
//! - `detect_nan_inf_metrics`: NaN/±Inf metric values (one issue per
//!   offending metric)
//! - `detect_failed_runs`: status matching a configured failure token
//! - `detect_overfitting`: val/train loss ratio over threshold, with a
//!   defined infinite-ratio outcome for zero train loss
//! - `detect_short_runs`: duration at or below a per-sweep quantile,
//!   recomputed independently for each duration signal

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::stats::{fmt_num, quantile, sorted_finite};
use crate::sweep::{Sweep, TrialRecord};


/// Pathology class of a flagged trial
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    NanOrInfMetric,
    FailedRun,
    OverfittingSuspect,
    ShortRun,
}

impl IssueType {
    /// Stable snake_case name, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            IssueType::NanOrInfMetric => "nan_or_inf_metric",
            IssueType::FailedRun => "failed_run",
            IssueType::OverfittingSuspect => "overfitting_suspect",
            IssueType::ShortRun => "short_run",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Issue severity, ordered Low < Medium < High.
///
/// Derived deterministically from the triggering magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One flagged pathology, attached to one trial.
///
/// Immutable once created; `trial_id` references (does not own) the
/// originating record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Issue {
    pub trial_id: String,
    pub issue_type: IssueType,
    pub severity: Severity,
    /// Free-form facts supporting the flag (offending metric, ratio, ...)
    pub evidence: BTreeMap<String, String>,
}

impl Issue {
    fn new(trial: &TrialRecord, issue_type: IssueType, severity: Severity) -> Self {
        Self {
            trial_id: trial.id.clone(),
            issue_type,
            severity,
            evidence: BTreeMap::new(),
        }
    }

    fn with(mut self, key: &str, value: String) -> Self {
        self.evidence.insert(key.to_string(), value);
        self
    }
}

/// Selectable detector, so the detector set is configuration rather than
/// code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorKind {
    NanInfMetrics,
    FailedRuns,
    Overfitting,
    ShortRuns,
}

impl DetectorKind {
    /// The full suite, in default execution order.
    pub fn all() -> [DetectorKind; 4] {
        [
            DetectorKind::NanInfMetrics,
            DetectorKind::FailedRuns,
            DetectorKind::Overfitting,
            DetectorKind::ShortRuns,
        ]
    }
}

/// Run the configured detectors over the sweep, in configured order.
pub fn run_detectors(sweep: &Sweep, config: &AnalysisConfig) -> Vec<Issue> {
    let mut issues = Vec::new();
    for kind in &config.detectors {
        match kind {
            DetectorKind::NanInfMetrics => issues.extend(detect_nan_inf_metrics(sweep, config)),
            DetectorKind::FailedRuns => issues.extend(detect_failed_runs(sweep, config)),
            DetectorKind::Overfitting => issues.extend(detect_overfitting(sweep, config)),
            DetectorKind::ShortRuns => issues.extend(detect_short_runs(sweep, config)),
        }
    }
    issues
}

/// Flag every NaN or ±Inf metric value, one issue per offending metric.
///
/// Severity is High for the paired loss roles (the primary training
/// signal) and Medium for any other metric.
pub fn detect_nan_inf_metrics(sweep: &Sweep, config: &AnalysisConfig) -> Vec<Issue> {
    let mut issues = Vec::new();
    for trial in sweep.trials() {
        for (metric, &value) in &trial.metrics {
            if value.is_nan() || value.is_infinite() {
                let severity = if config.roles.is_loss(metric) {
                    Severity::High
                } else {
                    Severity::Medium
                };
                issues.push(
                    Issue::new(trial, IssueType::NanOrInfMetric, severity)
                        .with("metric", metric.clone())
                        .with("value", fmt_num(value)),
                );
            }
        }
    }
    issues
}

/// Flag trials whose status matches a configured failure token.
pub fn detect_failed_runs(sweep: &Sweep, config: &AnalysisConfig) -> Vec<Issue> {
    let mut issues = Vec::new();
    for trial in sweep.trials() {
        let matched = config
            .failure_statuses
            .iter()
            .any(|token| token.eq_ignore_ascii_case(trial.status.as_str()));
        if matched {
            issues.push(
                Issue::new(trial, IssueType::FailedRun, Severity::High)
                    .with("status", trial.status.as_str().to_string()),
            );
        }
    }
    issues
}

/// Flag trials whose val/train loss ratio is at or above the configured
/// threshold.
///
/// Defined edge cases: `train == 0 && val > 0` is infinite overfitting
/// (flagged with an `inf` ratio marker, never a division fault);
/// `train == 0 && val == 0` is degenerate and skipped; a NaN on either
/// side skips the trial.
pub fn detect_overfitting(sweep: &Sweep, config: &AnalysisConfig) -> Vec<Issue> {
    let roles = &config.roles;
    let mut issues = Vec::new();
    for trial in sweep.trials() {
        let (Some(&train), Some(&val)) = (
            trial.metrics.get(&roles.train_loss),
            trial.metrics.get(&roles.val_loss),
        ) else {
            continue;
        };
        if train.is_nan() || val.is_nan() {
            continue;
        }
        if train == 0.0 && val == 0.0 {
            continue;
        }
        let ratio = if train == 0.0 {
            if val > 0.0 { f64::INFINITY } else { f64::NEG_INFINITY }
        } else {
            val / train
        };
        if ratio >= config.overfit_ratio_threshold {
            let severity = if ratio >= config.overfit_high_ratio {
                Severity::High
            } else {
                Severity::Medium
            };
            issues.push(
                Issue::new(trial, IssueType::OverfittingSuspect, severity)
                    .with("ratio", fmt_num(ratio))
                    .with("train_loss", fmt_num(train))
                    .with("val_loss", fmt_num(val)),
            );
        }
    }
    issues
}

/// Flag trials whose duration sits at or below the per-sweep quantile
/// threshold.
///
/// The threshold is recomputed per sweep and per duration signal (epochs
/// and runtime independently), so "short" is relative to this sweep rather
/// than an absolute constant. A trial short on either signal yields one
/// issue whose evidence lists every triggering signal.
pub fn detect_short_runs(sweep: &Sweep, config: &AnalysisConfig) -> Vec<Issue> {
    let roles = &config.roles;
    let q = config.short_run_quantile;

    let epoch_values = sorted_finite(sweep.trials().iter().filter_map(|t| t.epochs));
    let runtime_values = sorted_finite(sweep.trials().iter().filter_map(|t| t.runtime_sec));
    let epoch_threshold = quantile(&epoch_values, q);
    let runtime_threshold = quantile(&runtime_values, q);

    let mut issues = Vec::new();
    for trial in sweep.trials() {
        let mut issue: Option<Issue> = None;
        let signals = [
            (roles.epochs.as_str(), trial.epochs, epoch_threshold),
            (roles.runtime.as_str(), trial.runtime_sec, runtime_threshold),
        ];
        for (name, value, threshold) in signals {
            let (Some(v), Some(thr)) = (value, threshold) else {
                continue;
            };
            if v.is_finite() && v <= thr {
                let evidence = format!("{} (<= {})", fmt_num(v), fmt_num(thr));
                issue = Some(
                    issue
                        .unwrap_or_else(|| Issue::new(trial, IssueType::ShortRun, Severity::Medium))
                        .with(name, evidence),
                );
            }
        }
        issues.extend(issue);
    }
    issues
}
