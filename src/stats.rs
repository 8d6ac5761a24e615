//! Small numeric helpers shared by the detectors and the correlation engine

/// Empirical quantile with linear interpolation between order statistics.
///
/// `sorted` must be ascending. Returns `None` for an empty slice. The
/// interpolation scheme matches the conventional `pos = q * (n - 1)`
/// definition, so the same function serves both the short-run threshold
/// and the bucket edge computation.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Collect the finite values of an iterator, sorted ascending.
pub(crate) fn sorted_finite(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Render a float for evidence strings and bucket labels.
///
/// Integral values drop the trailing `.0` so trial ids and categorical
/// labels built from numbers read naturally ("3", not "3.0").
pub(crate) fn fmt_num(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
