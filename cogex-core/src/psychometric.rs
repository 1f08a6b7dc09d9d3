use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::error::{Error, Result};

/// Φ(z) via the complementary error function, accurate in both tails.
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z * FRAC_1_SQRT_2)
}

pub fn standard_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// Gaussian-CDF psychometric function P("test longer" | x) = Φ((x − μ) / σ).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsychometricFunction {
    pub mu: f64,
    pub sigma: f64,
}

impl PsychometricFunction {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() {
            return Err(Error::config(format!("mu must be finite, got {mu}")));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Error::config(format!(
                "sigma must be finite and > 0, got {sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }

    pub fn z(&self, x: f64) -> f64 {
        (x - self.mu) / self.sigma
    }

    pub fn probability(&self, x: f64) -> f64 {
        standard_normal_cdf(self.z(x))
    }
}
