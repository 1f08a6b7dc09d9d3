use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use cogex_core::{Error, Result, StimulusLevel};
use cogex_experiment::SessionLog;
use serde::{Deserialize, Serialize};

use crate::aggregate::{LevelSummary, ProbabilityAggregator};
use crate::fit::{FitResult, InitialGuess, PsychometricFitter};
use crate::metrics::{MetricExtractor, Metrics};

pub const CURVE_SAMPLES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f64,
    pub p: f64,
}

/// Vertical guide lines for a plot of the fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Markers {
    pub pse: f64,
    pub pse_plus_jnd: f64,
}

/// Everything a plotting collaborator needs: raw rates, the fitted curve and
/// the two markers, plus the numbers that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metrics: Metrics,
    pub standard_errors: Metrics,
    pub fit: FitResult,
    pub summaries: Vec<LevelSummary>,
    pub curve: Vec<CurvePoint>,
    pub markers: Markers,
}

impl AnalysisReport {
    pub fn new(summaries: Vec<LevelSummary>, fit: FitResult) -> Result<Self> {
        let metrics = MetricExtractor::extract(&fit)?;
        let (se_pse, se_jnd) = MetricExtractor::standard_errors(&fit);
        let curve = sample_curve(&fit, &summaries);
        Ok(Self {
            markers: Markers {
                pse: metrics.pse,
                pse_plus_jnd: metrics.upper_threshold(),
            },
            standard_errors: Metrics {
                pse: se_pse,
                jnd: se_jnd,
            },
            metrics,
            fit,
            summaries,
            curve,
        })
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

fn sample_curve(fit: &FitResult, summaries: &[LevelSummary]) -> Vec<CurvePoint> {
    let (Some(lo), Some(hi)) = (
        summaries.iter().map(|s| s.level).min().map(|l| l.ratio()),
        summaries.iter().map(|s| s.level).max().map(|l| l.ratio()),
    ) else {
        return Vec::new();
    };
    let step = (hi - lo) / (CURVE_SAMPLES - 1) as f64;
    (0..CURVE_SAMPLES)
        .map(|i| {
            let x = if i == CURVE_SAMPLES - 1 {
                hi
            } else {
                lo + step * i as f64
            };
            CurvePoint {
                x,
                p: fit.predict(x),
            }
        })
        .collect()
}

/// Runs the analysis half end to end on a loaded session log. When
/// `expected` is given, every listed level must have at least one response.
pub fn analyze(
    log: &SessionLog,
    expected: Option<&[StimulusLevel]>,
    guess: InitialGuess,
) -> Result<AnalysisReport> {
    let summaries = match expected {
        Some(levels) => ProbabilityAggregator::aggregate_expected(log, levels)?,
        None => ProbabilityAggregator::aggregate(log)?,
    };
    let fit = PsychometricFitter::new().fit(&summaries, guess)?;
    AnalysisReport::new(summaries, fit)
}
