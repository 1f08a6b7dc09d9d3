use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// z-distance between the 50th and 75th percentile of the standard normal.
pub const JND_QUANTILE_Z: f64 = 0.6745;

/// Test-to-standard length ratio. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct StimulusLevel(f64);

impl StimulusLevel {
    pub fn new(ratio: f64) -> Result<Self> {
        if ratio.is_finite() && ratio > 0.0 {
            Ok(Self(ratio))
        } else {
            Err(Error::config(format!(
                "stimulus ratio must be finite and > 0, got {ratio}"
            )))
        }
    }

    pub fn ratio(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for StimulusLevel {
    type Error = Error;

    fn try_from(ratio: f64) -> Result<Self> {
        Self::new(ratio)
    }
}

impl From<StimulusLevel> for f64 {
    fn from(level: StimulusLevel) -> f64 {
        level.0
    }
}

impl PartialEq for StimulusLevel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StimulusLevel {}

impl PartialOrd for StimulusLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StimulusLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for StimulusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical line lengths handed to the presentation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StimulusPair {
    pub left: f64,
    pub right: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_and_non_finite() {
        assert!(StimulusLevel::new(0.0).is_err());
        assert!(StimulusLevel::new(-1.0).is_err());
        assert!(StimulusLevel::new(f64::NAN).is_err());
        assert!(StimulusLevel::new(f64::INFINITY).is_err());
        assert_eq!(StimulusLevel::new(1.05).unwrap().ratio(), 1.05);
    }

    #[test]
    fn orders_by_ratio() {
        let mut levels: Vec<_> = [1.1, 0.9, 1.0]
            .into_iter()
            .map(|r| StimulusLevel::new(r).unwrap())
            .collect();
        levels.sort();
        let ratios: Vec<f64> = levels.iter().map(StimulusLevel::ratio).collect();
        assert_eq!(ratios, vec![0.9, 1.0, 1.1]);
    }

    #[test]
    fn deserialize_validates() {
        let ok: StimulusLevel = serde_json::from_str("0.95").unwrap();
        assert_eq!(ok.ratio(), 0.95);
        assert!(serde_json::from_str::<StimulusLevel>("-0.5").is_err());
    }
}
