use cogex_core::{Error, Result};
use nalgebra::{Matrix2, Vector2};
use tracing::{debug, warn};

/// Two-parameter curve `y = f(x; p)` with an analytic gradient in `p`.
pub trait CurveModel {
    fn value(&self, x: f64, params: &Vector2<f64>) -> f64;
    fn gradient(&self, x: f64, params: &Vector2<f64>) -> Vector2<f64>;

    /// Parameter bounds. Steps landing outside are rejected by the solver.
    fn is_feasible(&self, params: &Vector2<f64>) -> bool {
        params.iter().all(|v| v.is_finite())
    }

    /// Limits how far one accepted step may move. A rejected step raises
    /// the damping, which shortens the next attempt.
    fn admits_step(&self, _from: &Vector2<f64>, _to: &Vector2<f64>) -> bool {
        true
    }
}

/// Least-squares optimum with its parameter covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub params: Vector2<f64>,
    /// `(JᵀJ)⁻¹ · SSR / (m − 2)`; infinite with no residual degrees of freedom.
    pub covariance: Matrix2<f64>,
    pub ssr: f64,
    pub iterations: usize,
}

/// Nonlinear least-squares backend. Any implementation must either return a
/// converged, finite optimum or a `FitConvergence` error.
pub trait LeastSquaresSolver {
    fn solve(
        &self,
        model: &dyn CurveModel,
        xs: &[f64],
        ys: &[f64],
        initial: Vector2<f64>,
    ) -> Result<Solution>;
}

#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_damping: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: 600,
            ftol: 1e-12,
            xtol: 1e-10,
            gtol: 1e-14,
            initial_damping: 1e-3,
        }
    }
}

const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e16;
const MIN_DIAGONAL: f64 = 1e-12;
const STALL_GTOL: f64 = 1e-8;
const MAX_CONDITION: f64 = 1e14;

struct Normal {
    jtj: Matrix2<f64>,
    jtr: Vector2<f64>,
    ssr: f64,
}

fn normal_equations(model: &dyn CurveModel, xs: &[f64], ys: &[f64], p: &Vector2<f64>) -> Normal {
    let mut jtj = Matrix2::zeros();
    let mut jtr = Vector2::zeros();
    let mut ssr = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let r = y - model.value(x, p);
        let g = model.gradient(x, p);
        jtj += g * g.transpose();
        jtr += g * r;
        ssr += r * r;
    }
    Normal { jtj, jtr, ssr }
}

impl LevenbergMarquardt {
    fn covariance(&self, normal: &Normal, m: usize) -> Result<Matrix2<f64>> {
        let jtj = normal.jtj;
        let trace = jtj.trace();
        let det = jtj.determinant();
        if !(trace > 0.0 && det > 0.0 && trace * trace / det < MAX_CONDITION) {
            return Err(Error::fit("Jacobian is singular at the optimum"));
        }
        let inverse = jtj
            .try_inverse()
            .ok_or_else(|| Error::fit("Jacobian is singular at the optimum"))?;
        if m <= 2 {
            warn!(points = m, "no residual degrees of freedom, covariance is unbounded");
            return Ok(Matrix2::repeat(f64::INFINITY));
        }
        Ok(inverse * (normal.ssr / (m - 2) as f64))
    }

    fn finish(
        &self,
        params: Vector2<f64>,
        normal: &Normal,
        m: usize,
        iterations: usize,
    ) -> Result<Solution> {
        debug!(iterations, ssr = normal.ssr, "levenberg-marquardt converged");
        Ok(Solution {
            params,
            covariance: self.covariance(normal, m)?,
            ssr: normal.ssr,
            iterations,
        })
    }
}

impl LeastSquaresSolver for LevenbergMarquardt {
    fn solve(
        &self,
        model: &dyn CurveModel,
        xs: &[f64],
        ys: &[f64],
        initial: Vector2<f64>,
    ) -> Result<Solution> {
        if xs.len() != ys.len() {
            return Err(Error::fit(format!(
                "{} x values but {} y values",
                xs.len(),
                ys.len()
            )));
        }
        if !model.is_feasible(&initial) {
            return Err(Error::fit(format!(
                "initial guess ({}, {}) is outside the parameter bounds",
                initial[0], initial[1]
            )));
        }

        let m = xs.len();
        let mut p = initial;
        let mut normal = normal_equations(model, xs, ys, &p);
        let mut lambda = self.initial_damping;
        if !normal.ssr.is_finite() {
            return Err(Error::fit("residuals are not finite at the initial guess"));
        }

        for iteration in 1..=self.max_iterations {
            if normal.jtr.amax() <= self.gtol || normal.ssr <= f64::EPSILON * f64::EPSILON {
                return self.finish(p, &normal, m, iteration - 1);
            }
            let scale = normal.jtj.diagonal().map(|d| d.max(MIN_DIAGONAL));

            loop {
                let damped = normal.jtj + Matrix2::from_diagonal(&(scale * lambda));
                let step = damped.cholesky().map(|c| c.solve(&normal.jtr));
                if let Some(step) = step {
                    let candidate = p + step;
                    if model.is_feasible(&candidate) && model.admits_step(&p, &candidate) {
                        let next = normal_equations(model, xs, ys, &candidate);
                        if next.ssr.is_finite() && next.ssr < normal.ssr {
                            let reduction = (normal.ssr - next.ssr) / normal.ssr;
                            let small_step =
                                step.norm() <= self.xtol * (p.norm() + self.xtol);
                            p = candidate;
                            normal = next;
                            lambda = (lambda / 10.0).max(MIN_DAMPING);
                            debug!(iteration, ssr = normal.ssr, lambda, "step accepted");
                            if small_step || reduction <= self.ftol {
                                return self.finish(p, &normal, m, iteration);
                            }
                            break;
                        }
                    }
                }

                lambda *= 10.0;
                if lambda > MAX_DAMPING {
                    // No downhill step left; only a stationary point counts.
                    if normal.jtr.amax() <= STALL_GTOL {
                        return self.finish(p, &normal, m, iteration);
                    }
                    return Err(Error::fit(format!(
                        "no downhill step after {iteration} iterations (gradient {:.3e})",
                        normal.jtr.amax()
                    )));
                }
            }
        }

        Err(Error::fit(format!(
            "no convergence within {} iterations",
            self.max_iterations
        )))
    }
}
