use cogex_core::{
    Error, PsychometricFunction, Result, standard_normal_cdf, standard_normal_pdf,
};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::LevelSummary;
use crate::solver::{CurveModel, LeastSquaresSolver, LevenbergMarquardt};

/// Largest factor by which σ may grow or shrink in one solver step. Without
/// it an undamped first step can collapse σ toward zero, where the curve is a
/// step function and the Jacobian vanishes.
const MAX_SIGMA_RATIO: f64 = 4.0;

/// Φ((x − μ) / σ) with parameters `[μ, σ]`, σ > 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianCdfModel;

impl CurveModel for GaussianCdfModel {
    fn value(&self, x: f64, p: &Vector2<f64>) -> f64 {
        standard_normal_cdf((x - p[0]) / p[1])
    }

    fn gradient(&self, x: f64, p: &Vector2<f64>) -> Vector2<f64> {
        let sigma = p[1];
        let z = (x - p[0]) / sigma;
        let density = standard_normal_pdf(z);
        Vector2::new(-density / sigma, -density * z / sigma)
    }

    fn is_feasible(&self, p: &Vector2<f64>) -> bool {
        p[0].is_finite() && p[1].is_finite() && p[1] > 0.0
    }

    fn admits_step(&self, from: &Vector2<f64>, to: &Vector2<f64>) -> bool {
        let ratio = to[1] / from[1];
        (1.0 / MAX_SIGMA_RATIO..=MAX_SIGMA_RATIO).contains(&ratio)
    }
}

/// Starting point for the optimizer; σ₀ must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialGuess {
    pub mu: f64,
    pub sigma: f64,
}

impl InitialGuess {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() {
            return Err(Error::config(format!("initial mu must be finite, got {mu}")));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Error::config(format!(
                "initial sigma must be > 0, got {sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }
}

impl Default for InitialGuess {
    fn default() -> Self {
        Self { mu: 1.0, sigma: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub mu: f64,
    pub sigma: f64,
    /// Row-major covariance of `[mu, sigma]`.
    pub covariance: [[f64; 2]; 2],
    pub ssr: f64,
    pub iterations: usize,
}

impl FitResult {
    pub fn function(&self) -> Result<PsychometricFunction> {
        PsychometricFunction::new(self.mu, self.sigma)
            .map_err(|_| Error::fit(format!("invalid fit mu={} sigma={}", self.mu, self.sigma)))
    }

    pub fn predict(&self, x: f64) -> f64 {
        standard_normal_cdf((x - self.mu) / self.sigma)
    }

    pub fn covariance_matrix(&self) -> Matrix2<f64> {
        let c = self.covariance;
        Matrix2::new(c[0][0], c[0][1], c[1][0], c[1][1])
    }

    /// Standard errors of (mu, sigma).
    pub fn standard_errors(&self) -> (f64, f64) {
        (self.covariance[0][0].sqrt(), self.covariance[1][1].sqrt())
    }
}

/// Fits the Gaussian-CDF psychometric function to per-level probabilities
/// by unweighted nonlinear least squares.
#[derive(Debug, Clone, Default)]
pub struct PsychometricFitter<S = LevenbergMarquardt> {
    solver: S,
}

impl PsychometricFitter<LevenbergMarquardt> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: LeastSquaresSolver> PsychometricFitter<S> {
    pub fn with_solver(solver: S) -> Self {
        Self { solver }
    }

    pub fn fit(&self, summaries: &[LevelSummary], guess: InitialGuess) -> Result<FitResult> {
        let guess = InitialGuess::new(guess.mu, guess.sigma)?;
        check_degenerate(summaries)?;

        let xs: Vec<f64> = summaries.iter().map(|s| s.level.ratio()).collect();
        let ys: Vec<f64> = summaries.iter().map(|s| s.probability).collect();
        let solution = self.solver.solve(
            &GaussianCdfModel,
            &xs,
            &ys,
            Vector2::new(guess.mu, guess.sigma),
        )?;

        let (mu, sigma) = (solution.params[0], solution.params[1]);
        if !(mu.is_finite() && sigma.is_finite() && sigma > 0.0) {
            return Err(Error::fit(format!(
                "solver returned mu={mu}, sigma={sigma}"
            )));
        }

        let fit = FitResult {
            mu,
            sigma,
            covariance: [
                [solution.covariance[(0, 0)], solution.covariance[(0, 1)]],
                [solution.covariance[(1, 0)], solution.covariance[(1, 1)]],
            ],
            ssr: solution.ssr,
            iterations: solution.iterations,
        };

        let (lo, hi) = xs
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        if fit.predict(hi) - fit.predict(lo) < 1e-9 {
            return Err(Error::fit("fitted curve is flat over the stimulus range"));
        }

        info!(
            mu = fit.mu,
            sigma = fit.sigma,
            ssr = fit.ssr,
            iterations = fit.iterations,
            "psychometric fit"
        );
        Ok(fit)
    }
}

fn check_degenerate(summaries: &[LevelSummary]) -> Result<()> {
    for s in summaries {
        if !(s.probability.is_finite() && (0.0..=1.0).contains(&s.probability)) {
            return Err(Error::fit(format!(
                "probability {} at level {} is outside [0, 1]",
                s.probability, s.level
            )));
        }
        if s.n == 0 {
            return Err(Error::incomplete(format!(
                "level {} has no recorded responses",
                s.level
            )));
        }
    }

    let mut levels: Vec<_> = summaries.iter().map(|s| s.level).collect();
    levels.sort();
    levels.dedup();
    if levels.len() < 2 {
        return Err(Error::fit(format!(
            "need at least 2 distinct stimulus levels, got {}",
            levels.len()
        )));
    }

    let first = summaries[0].probability;
    if summaries.iter().all(|s| s.probability == first) {
        return Err(Error::fit(format!(
            "every level has the same response probability ({first}); the curve is not identifiable"
        )));
    }

    // 0s strictly below 1s: any σ > 0 is beaten by a smaller one.
    if summaries
        .iter()
        .all(|s| s.probability == 0.0 || s.probability == 1.0)
    {
        let highest_zero = summaries
            .iter()
            .filter(|s| s.probability == 0.0)
            .map(|s| s.level)
            .max();
        let lowest_one = summaries
            .iter()
            .filter(|s| s.probability == 1.0)
            .map(|s| s.level)
            .min();
        if let (Some(zero), Some(one)) = (highest_zero, lowest_one) {
            if zero < one {
                return Err(Error::fit(
                    "responses are perfectly separated; sigma is not identifiable",
                ));
            }
        }
    }
    Ok(())
}
