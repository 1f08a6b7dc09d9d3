use std::fs;
use std::path::Path;

use cogex_core::{Error, Result, StimulusLevel};
use serde::{Deserialize, Serialize};

use crate::design::DesignMatrixBuilder;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Test/standard ratios presented in the session.
    pub levels: Vec<f64>,
    pub trials_per_level: u32,
    /// Overrides `trials_per_level` when set; one entry per level.
    pub per_level_repetitions: Option<Vec<u32>>,
    /// Standard line length in pixels.
    pub standard_length: f64,
    pub fixation_ms: u64,
    pub exposure_ms: u64,
    pub left_key: char,
    pub right_key: char,
    pub initial_mu: f64,
    pub initial_sigma: f64,
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            levels: vec![0.90, 0.95, 0.98, 1.0, 1.02, 1.05, 1.10],
            trials_per_level: 10,
            per_level_repetitions: None,
            standard_length: 200.0,
            fixation_ms: 500,
            exposure_ms: 400,
            left_key: 'f',
            right_key: 'j',
            initial_mu: 1.0,
            initial_sigma: 0.1,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.design()?;
        if !(self.standard_length.is_finite() && self.standard_length > 0.0) {
            return Err(Error::config(format!(
                "standard length must be > 0, got {}",
                self.standard_length
            )));
        }
        if !self.initial_mu.is_finite() {
            return Err(Error::config("initial mu guess must be finite"));
        }
        if !(self.initial_sigma.is_finite() && self.initial_sigma > 0.0) {
            return Err(Error::config(format!(
                "initial sigma guess must be > 0, got {}",
                self.initial_sigma
            )));
        }
        if self.left_key.to_ascii_lowercase() == self.right_key.to_ascii_lowercase() {
            return Err(Error::config("left and right response keys must differ"));
        }
        Ok(())
    }

    pub fn stimulus_levels(&self) -> Result<Vec<StimulusLevel>> {
        self.levels.iter().map(|&r| StimulusLevel::new(r)).collect()
    }

    /// Design builder for this configuration, validated.
    pub fn design(&self) -> Result<DesignMatrixBuilder> {
        let levels = self.stimulus_levels()?;
        let builder = match &self.per_level_repetitions {
            Some(counts) => {
                if counts.len() != levels.len() {
                    return Err(Error::config(format!(
                        "{} repetition counts given for {} levels",
                        counts.len(),
                        levels.len()
                    )));
                }
                DesignMatrixBuilder::with_counts(levels.into_iter().zip(counts.iter().copied()))
            }
            None => DesignMatrixBuilder::uniform(levels, self.trials_per_level),
        };
        builder.validate()?;
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::ErrorKind;

    #[test]
    fn default_matches_reference_session() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.design().unwrap().total_trials(), 70);
    }

    #[test]
    fn rejects_bad_values() {
        let cases: Vec<Box<dyn Fn(&mut ExperimentConfig)>> = vec![
            Box::new(|c: &mut ExperimentConfig| c.levels.clear()),
            Box::new(|c: &mut ExperimentConfig| c.levels.push(0.0)),
            Box::new(|c: &mut ExperimentConfig| c.trials_per_level = 0),
            Box::new(|c: &mut ExperimentConfig| c.initial_sigma = 0.0),
            Box::new(|c: &mut ExperimentConfig| c.initial_sigma = -0.1),
            Box::new(|c: &mut ExperimentConfig| c.standard_length = 0.0),
            Box::new(|c: &mut ExperimentConfig| c.right_key = 'F'),
            Box::new(|c: &mut ExperimentConfig| c.per_level_repetitions = Some(vec![1, 2])),
            Box::new(|c: &mut ExperimentConfig| c.per_level_repetitions = Some(vec![1, 1, 1, 0, 1, 1, 1])),
        ];
        for mutate in cases {
            let mut config = ExperimentConfig::default();
            mutate(&mut config);
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{err}");
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{ "levels": [0.8, 1.0, 1.2], "trials_per_level": 4 }"#)
                .unwrap();
        assert_eq!(config.design().unwrap().total_trials(), 12);
        assert_eq!(config.left_key, 'f');
        assert_eq!(config.initial_sigma, 0.1);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "seed": 42, "per_level_repetitions": [1,2,3,4,5,6,7] }"#).unwrap();
        let config = ExperimentConfig::from_json_file(&path).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.design().unwrap().total_trials(), 28);

        fs::write(&path, r#"{ "initial_sigma": -1.0 }"#).unwrap();
        let err = ExperimentConfig::from_json_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
