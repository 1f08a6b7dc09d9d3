use std::fmt;

use cogex_core::{Error, JND_QUANTILE_Z, Result};
use serde::{Deserialize, Serialize};

use crate::fit::FitResult;

/// Bias and sensitivity in stimulus-ratio units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub pse: f64,
    pub jnd: f64,
}

impl Metrics {
    /// Ratio at which the fitted curve predicts 75% "test longer".
    pub fn upper_threshold(&self) -> f64 {
        self.pse + self.jnd
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PSE (Bias): {:.4} (Ideal is 1.0)", self.pse)?;
        write!(f, "JND (Sensitivity): {:.4} (Lower is better)", self.jnd)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricExtractor;

impl MetricExtractor {
    /// PSE = μ, JND = σ · 0.6745.
    pub fn extract(fit: &FitResult) -> Result<Metrics> {
        if !(fit.mu.is_finite() && fit.sigma.is_finite() && fit.sigma > 0.0) {
            return Err(Error::fit(format!(
                "cannot derive metrics from mu={} sigma={}",
                fit.mu, fit.sigma
            )));
        }
        Ok(Metrics {
            pse: fit.mu,
            jnd: fit.sigma * JND_QUANTILE_Z,
        })
    }

    /// Standard errors of (PSE, JND) from the fit covariance.
    pub fn standard_errors(fit: &FitResult) -> (f64, f64) {
        let (se_mu, se_sigma) = fit.standard_errors();
        (se_mu, se_sigma * JND_QUANTILE_Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cogex_core::ErrorKind;

    fn fit(mu: f64, sigma: f64) -> FitResult {
        FitResult {
            mu,
            sigma,
            covariance: [[1e-4, 0.0], [0.0, 4e-4]],
            ssr: 0.0,
            iterations: 1,
        }
    }

    #[test]
    fn jnd_is_scaled_sigma() {
        let m = MetricExtractor::extract(&fit(1.0, 0.08)).unwrap();
        assert_eq!(m.pse, 1.0);
        assert_abs_diff_eq!(m.jnd, 0.05396, epsilon = 1e-12);
    }

    #[test]
    fn jnd_lands_on_75_percent() {
        let f = fit(0.97, 0.06);
        let m = MetricExtractor::extract(&f).unwrap();
        assert_abs_diff_eq!(f.predict(m.upper_threshold()), 0.75, epsilon = 1e-4);
        assert_abs_diff_eq!(f.predict(m.pse), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn invalid_fit_is_not_reported() {
        for (mu, sigma) in [(f64::NAN, 0.1), (1.0, 0.0), (1.0, -0.2), (1.0, f64::INFINITY)] {
            let err = MetricExtractor::extract(&fit(mu, sigma)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FitConvergence);
        }
    }

    #[test]
    fn display_uses_four_decimals() {
        let m = Metrics { pse: 1.012345, jnd: 0.053961 };
        assert_eq!(
            m.to_string(),
            "PSE (Bias): 1.0123 (Ideal is 1.0)\nJND (Sensitivity): 0.0540 (Lower is better)"
        );
    }

    #[test]
    fn standard_errors_scale_with_constant() {
        let (se_pse, se_jnd) = MetricExtractor::standard_errors(&fit(1.0, 0.08));
        assert_abs_diff_eq!(se_pse, 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(se_jnd, 0.02 * JND_QUANTILE_Z, epsilon = 1e-12);
    }
}
