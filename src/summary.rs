//! Sweep summary aggregation
//!
//! Pure counting over the detector and correlation outputs; no new
//! statistical computation happens here. The resulting [`SweepSummary`] is
//! the sole contract surface handed to the external reporting layer, so
//! its field layout is fixed and everything in it serializes to plain
//! structured data.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::correlate::ParamCorrelation;
use crate::detect::{Issue, IssueType, Severity};

/// Count and bounded example ids for one issue type.
#[derive(Clone, Debug, Serialize)]
pub struct IssueTypeSummary {
    pub count: usize,
    pub example_trial_ids: Vec<String>,
}

/// One immutable diagnostic summary per sweep analysis call.
#[derive(Clone, Debug, Serialize)]
pub struct SweepSummary {
    /// Every issue counts; a trial with two issues counts twice
    pub total_issues: usize,
    /// Distinct trial ids appearing in any issue
    pub trials_with_issues: usize,
    pub issues_by_type: BTreeMap<IssueType, IssueTypeSummary>,
    pub severity_histogram: BTreeMap<Severity, usize>,
    /// All bucket correlations, ranked
    pub param_correlations: Vec<ParamCorrelation>,
    /// Top findings after per-hyperparameter deduplication
    pub ranked_findings: Vec<ParamCorrelation>,
}

/// Aggregate issues and ranked correlations into the summary.
///
/// `correlations` must already be in ranked order (as produced by
/// [`crate::correlate::correlate_params`]).
pub fn build_summary(
    issues: Vec<Issue>,
    correlations: Vec<ParamCorrelation>,
    config: &AnalysisConfig,
) -> SweepSummary {
    let total_issues = issues.len();

    let mut trial_ids = BTreeSet::new();
    let mut by_type: BTreeMap<IssueType, BTreeSet<&str>> = BTreeMap::new();
    let mut type_counts: BTreeMap<IssueType, usize> = BTreeMap::new();
    let mut severity_histogram: BTreeMap<Severity, usize> = BTreeMap::new();

    for issue in &issues {
        trial_ids.insert(issue.trial_id.as_str());
        by_type
            .entry(issue.issue_type)
            .or_default()
            .insert(issue.trial_id.as_str());
        *type_counts.entry(issue.issue_type).or_insert(0) += 1;
        *severity_histogram.entry(issue.severity).or_insert(0) += 1;
    }

    let issues_by_type = type_counts
        .into_iter()
        .map(|(issue_type, count)| {
            // BTreeSet iteration is ascending, so examples are deterministic.
            let example_trial_ids = by_type[&issue_type]
                .iter()
                .take(config.example_cap)
                .map(|id| id.to_string())
                .collect();
            (
                issue_type,
                IssueTypeSummary {
                    count,
                    example_trial_ids,
                },
            )
        })
        .collect();

    let ranked_findings = select_findings(&correlations, config);

    SweepSummary {
        total_issues,
        trials_with_issues: trial_ids.len(),
        issues_by_type,
        severity_histogram,
        param_correlations: correlations,
        ranked_findings,
    }
}

/// Pick the top-K findings, at most one bucket per hyperparameter unless a
/// second bucket is comparably extreme (clears the configured minimum rate
/// and support).
///
/// Zero-rate buckets are never findings: a healthy sweep yields an empty
/// list, not a report of its least-unhealthy buckets.
fn select_findings(
    correlations: &[ParamCorrelation],
    config: &AnalysisConfig,
) -> Vec<ParamCorrelation> {
    let mut per_param: BTreeMap<&str, usize> = BTreeMap::new();
    let mut findings = Vec::new();

    for corr in correlations {
        if findings.len() >= config.top_k_findings {
            break;
        }
        if corr.issue_rate <= 0.0 {
            continue;
        }
        let kept = per_param.entry(corr.param.as_str()).or_insert(0);
        let admit = match *kept {
            0 => true,
            1 => {
                corr.issue_rate >= config.second_finding_min_rate
                    && corr.support >= config.second_finding_min_support
            }
            _ => false,
        };
        if admit {
            *kept += 1;
            findings.push(corr.clone());
        }
    }
    findings
}
