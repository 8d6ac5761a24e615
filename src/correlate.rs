//! Hyperparameter-to-issue correlation engine
//!
//! For every hyperparameter observed anywhere in the sweep, partitions its
//! values into buckets (deterministic quantile intervals for numeric
//! columns, one bucket per literal for categorical) and estimates the
//! issue rate per bucket: the fraction of trials in the bucket carrying at
//! least one issue.
//!
//! Determinism guarantees:
//! - parameters are processed in ascending name order
//! - duplicate quantile edges are merged, so skewed or constant columns
//!   collapse to fewer, wider buckets instead of degenerate empty ones
//! - a constant column yields exactly one bucket spanning its sole value
//! - results are ranked by issue rate desc, support desc, parameter name,
//!   bucket position
//!
//! Columns are independent, so this loop could be parallelized; the engine
//! stays single-threaded and relies on the ranking pass for output order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::config::AnalysisConfig;
use crate::detect::Issue;
use crate::stats::quantile;
use crate::sweep::{ParamValue, Sweep};

/// Partition cell for one hyperparameter.
///
/// Numeric buckets are `[lower, upper)` intervals; the last bucket of a
/// partition (and the single bucket of a constant column) is closed on the
/// right.
#[derive(Clone, Debug, PartialEq)]
pub enum Bucket {
    Interval {
        lower: f64,
        upper: f64,
        inclusive_upper: bool,
    },
    Category(String),
}

impl Bucket {
    /// Whether a numeric value falls in this bucket.
    pub fn contains(&self, v: f64) -> bool {
        match self {
            Bucket::Interval {
                lower,
                upper,
                inclusive_upper,
            } => v >= *lower && (v < *upper || (*inclusive_upper && v <= *upper)),
            Bucket::Category(_) => false,
        }
    }

    /// Deterministic ordering: intervals by lower bound, then categories
    /// by label; intervals sort before categories.
    fn order(&self, other: &Bucket) -> Ordering {
        match (self, other) {
            (
                Bucket::Interval { lower: a, .. },
                Bucket::Interval { lower: b, .. },
            ) => a.total_cmp(b),
            (Bucket::Category(a), Bucket::Category(b)) => a.cmp(b),
            (Bucket::Interval { .. }, Bucket::Category(_)) => Ordering::Less,
            (Bucket::Category(_), Bucket::Interval { .. }) => Ordering::Greater,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Interval {
                lower,
                upper,
                inclusive_upper,
            } => {
                let close = if *inclusive_upper { "]" } else { ")" };
                write!(f, "[{lower}, {upper}{close}")
            }
            Bucket::Category(c) => write!(f, "{c}"),
        }
    }
}

/// Issue incidence for one hyperparameter bucket.
///
/// Serializes to the fixed wire layout `{param, bucket_low,
/// bucket_high_or_category, issue_rate, support, example_trial_ids}`
/// consumed by the external reporting layer.
#[derive(Clone, Debug)]
pub struct ParamCorrelation {
    pub param: String,
    pub bucket: Bucket,
    /// Fraction of trials in the bucket with at least one issue, in [0, 1]
    pub issue_rate: f64,
    /// Number of trials in the bucket, always >= 1
    pub support: usize,
    /// Bounded evidence sample: issue-bearing trials first, ascending id
    pub example_trial_ids: Vec<String>,
}

impl Serialize for ParamCorrelation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ParamCorrelation", 6)?;
        s.serialize_field("param", &self.param)?;
        match &self.bucket {
            Bucket::Interval { lower, upper, .. } => {
                s.serialize_field("bucket_low", &Some(*lower))?;
                s.serialize_field("bucket_high_or_category", upper)?;
            }
            Bucket::Category(label) => {
                s.serialize_field("bucket_low", &Option::<f64>::None)?;
                s.serialize_field("bucket_high_or_category", label)?;
            }
        }
        s.serialize_field("issue_rate", &self.issue_rate)?;
        s.serialize_field("support", &self.support)?;
        s.serialize_field("example_trial_ids", &self.example_trial_ids)?;
        s.end()
    }
}

/// Compute ranked per-bucket issue rates for every hyperparameter.
pub fn correlate_params(
    sweep: &Sweep,
    issues: &[Issue],
    config: &AnalysisConfig,
) -> Vec<ParamCorrelation> {
    let issue_ids: BTreeSet<&str> = issues.iter().map(|i| i.trial_id.as_str()).collect();

    let mut correlations = Vec::new();
    for param in sweep.param_names() {
        correlations.extend(correlate_one(sweep, &param, &issue_ids, config));
    }
    rank(&mut correlations);
    correlations
}

/// Rank correlations in place: issue rate desc, support desc, parameter
/// name asc, bucket position asc.
pub fn rank(correlations: &mut [ParamCorrelation]) {
    correlations.sort_by(|a, b| {
        b.issue_rate
            .total_cmp(&a.issue_rate)
            .then_with(|| b.support.cmp(&a.support))
            .then_with(|| a.param.cmp(&b.param))
            .then_with(|| a.bucket.order(&b.bucket))
    });
}

fn correlate_one(
    sweep: &Sweep,
    param: &str,
    issue_ids: &BTreeSet<&str>,
    config: &AnalysisConfig,
) -> Vec<ParamCorrelation> {
    // Step 1: collect present values; non-finite numerics count as missing
    // so they neither inflate nor deflate any bucket's rate.
    let observed: Vec<(&str, &ParamValue)> = sweep
        .trials()
        .iter()
        .filter_map(|t| t.hyperparams.get(param).map(|v| (t.id.as_str(), v)))
        .filter(|(_, v)| match v {
            ParamValue::Numeric(n) => n.is_finite(),
            ParamValue::Categorical(_) => true,
        })
        .collect();
    if observed.is_empty() {
        return Vec::new();
    }

    // Step 2: numeric iff every observed value is numeric.
    let all_numeric = observed
        .iter()
        .all(|(_, v)| matches!(v, ParamValue::Numeric(_)));

    let memberships: Vec<(Bucket, Vec<&str>)> = if all_numeric {
        numeric_buckets(&observed, config.bucket_count)
    } else {
        categorical_buckets(&observed)
    };

    // Steps 5-6: rates, support, bounded examples.
    memberships
        .into_iter()
        .filter(|(_, members)| !members.is_empty())
        .map(|(bucket, members)| {
            let support = members.len();
            let issue_count = members.iter().filter(|id| issue_ids.contains(*id)).count();
            ParamCorrelation {
                param: param.to_string(),
                bucket,
                issue_rate: issue_count as f64 / support as f64,
                support,
                example_trial_ids: pick_examples(&members, issue_ids, config.example_cap),
            }
        })
        .collect()
}

/// Quantile-partition a numeric column, merging duplicate edges.
fn numeric_buckets<'a>(
    observed: &[(&'a str, &ParamValue)],
    bucket_count: usize,
) -> Vec<(Bucket, Vec<&'a str>)> {
    let mut values: Vec<f64> = observed
        .iter()
        .filter_map(|(_, v)| v.as_f64())
        .collect();
    values.sort_by(f64::total_cmp);

    let edges = quantile_edges(&values, bucket_count);

    let buckets: Vec<Bucket> = if edges.len() == 1 {
        // Constant column: one bucket spanning the sole value.
        vec![Bucket::Interval {
            lower: edges[0],
            upper: edges[0],
            inclusive_upper: true,
        }]
    } else {
        edges
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Bucket::Interval {
                lower: pair[0],
                upper: pair[1],
                inclusive_upper: i == edges.len() - 2,
            })
            .collect()
    };

    let mut memberships: Vec<(Bucket, Vec<&str>)> =
        buckets.into_iter().map(|b| (b, Vec::new())).collect();
    for &(id, value) in observed {
        let Some(v) = value.as_f64() else { continue };
        if let Some((_, members)) = memberships.iter_mut().find(|(b, _)| b.contains(v)) {
            members.push(id);
        }
    }
    memberships
}

/// One bucket per distinct literal, in ascending label order.
fn categorical_buckets<'a>(
    observed: &[(&'a str, &ParamValue)],
) -> Vec<(Bucket, Vec<&'a str>)> {
    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for &(id, value) in observed {
        groups.entry(value.label()).or_default().push(id);
    }
    groups
        .into_iter()
        .map(|(label, members)| (Bucket::Category(label), members))
        .collect()
}

/// Quantile edges over a sorted column, strictly increasing.
///
/// Coinciding edges (constant or heavily skewed distributions) are merged
/// here rather than left as zero-width buckets.
fn quantile_edges(sorted: &[f64], bucket_count: usize) -> Vec<f64> {
    let bucket_count = bucket_count.max(1);
    let mut edges: Vec<f64> = Vec::with_capacity(bucket_count + 1);
    for i in 0..=bucket_count {
        let q = i as f64 / bucket_count as f64;
        if let Some(edge) = quantile(sorted, q) {
            if edges.last().map_or(true, |&last| edge > last) {
                edges.push(edge);
            }
        }
    }
    edges
}

/// Up to `cap` example ids: issue-bearing trials first, each group in
/// ascending id order.
fn pick_examples(members: &[&str], issue_ids: &BTreeSet<&str>, cap: usize) -> Vec<String> {
    let mut flagged: Vec<&str> = members
        .iter()
        .copied()
        .filter(|id| issue_ids.contains(id))
        .collect();
    let mut healthy: Vec<&str> = members
        .iter()
        .copied()
        .filter(|id| !issue_ids.contains(id))
        .collect();
    flagged.sort_unstable();
    healthy.sort_unstable();
    flagged
        .into_iter()
        .chain(healthy)
        .take(cap)
        .map(str::to_string)
        .collect()
}
