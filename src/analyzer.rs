//! Top-level sweep analyzer
//!
//! [`SweepAnalyzer`] holds one [`AnalysisConfig`] and runs the full
//! pipeline: detectors, correlation engine, summarizer. The pipeline is
//! synchronous and side-effect free; given identical input it produces
//! byte-identical serialized output.

use crate::config::AnalysisConfig;
use crate::correlate::correlate_params;
use crate::detect::run_detectors;
use crate::error::Result;
use crate::summary::{build_summary, SweepSummary};
use crate::sweep::{RawRow, Sweep};

/// Configured analysis entry point.
#[derive(Clone, Debug, Default)]
pub struct SweepAnalyzer {
    config: AnalysisConfig,
}

impl SweepAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a validated sweep.
    ///
    /// Infallible: contract errors are rejected at [`Sweep`] construction,
    /// and every data-quality condition has a defined outcome. A perfectly
    /// healthy sweep yields a complete summary empty of findings.
    pub fn analyze(&self, sweep: &Sweep) -> SweepSummary {
        let issues = run_detectors(sweep, &self.config);
        let correlations = correlate_params(sweep, &issues, &self.config);
        build_summary(issues, correlations, &self.config)
    }

    /// Classify raw rows into a sweep, then analyze.
    ///
    /// Surfaces contract errors (empty input, missing identifier or status
    /// column, duplicate ids) as typed failures.
    pub fn analyze_rows(&self, rows: Vec<RawRow>) -> Result<SweepSummary> {
        let sweep = Sweep::from_rows(rows, &self.config.roles)?;
        Ok(self.analyze(&sweep))
    }
}
