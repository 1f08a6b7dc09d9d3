use std::collections::BTreeSet;

use cogex_core::{Error, Result, Side, StimulusLevel, Trial};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Builds the randomized trial list: exact repetitions per level, a fair coin
/// per trial for the standard side, then a uniform shuffle.
///
/// Side assignment is i.i.d. rather than counterbalanced, so per-level left
/// and right counts are only equal in expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrixBuilder {
    entries: Vec<(StimulusLevel, u32)>,
}

impl DesignMatrixBuilder {
    pub fn uniform(levels: impl IntoIterator<Item = StimulusLevel>, repetitions: u32) -> Self {
        Self {
            entries: levels.into_iter().map(|l| (l, repetitions)).collect(),
        }
    }

    pub fn with_counts(entries: impl IntoIterator<Item = (StimulusLevel, u32)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[(StimulusLevel, u32)] {
        &self.entries
    }

    pub fn levels(&self) -> Vec<StimulusLevel> {
        self.entries.iter().map(|(l, _)| *l).collect()
    }

    pub fn total_trials(&self) -> usize {
        self.entries.iter().map(|(_, n)| *n as usize).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::config("design needs at least one stimulus level"));
        }
        let mut seen = BTreeSet::new();
        for (level, repetitions) in &self.entries {
            if *repetitions == 0 {
                return Err(Error::config(format!(
                    "level {level} has a repetition count of zero"
                )));
            }
            if !seen.insert(*level) {
                return Err(Error::config(format!("level {level} is listed twice")));
            }
        }
        Ok(())
    }

    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Trial>> {
        self.validate()?;

        let mut trials = Vec::with_capacity(self.total_trials());
        for (level, repetitions) in &self.entries {
            for _ in 0..*repetitions {
                let standard_side = if rng.random_bool(0.5) {
                    Side::Left
                } else {
                    Side::Right
                };
                trials.push(Trial::new(*level, standard_side));
            }
        }
        trials.shuffle(rng);

        debug!(
            trials = trials.len(),
            levels = self.entries.len(),
            "design matrix built"
        );
        Ok(trials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::ErrorKind;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeMap;

    fn levels(ratios: &[f64]) -> Vec<StimulusLevel> {
        ratios.iter().map(|&r| StimulusLevel::new(r).unwrap()).collect()
    }

    fn counts(trials: &[Trial]) -> BTreeMap<StimulusLevel, u32> {
        let mut map = BTreeMap::new();
        for t in trials {
            *map.entry(t.level).or_insert(0) += 1;
        }
        map
    }

    #[test]
    fn same_seed_same_design() {
        let builder = DesignMatrixBuilder::uniform(levels(&[0.9, 1.0, 1.1]), 10);
        let a = builder.build(&mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let b = builder.build(&mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let c = builder.build(&mut ChaCha8Rng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn per_level_counts_are_respected() {
        let builder =
            DesignMatrixBuilder::with_counts(levels(&[0.9, 1.0, 1.1]).into_iter().zip([3, 5, 1]));
        let trials = builder.build(&mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(trials.len(), 9);
        let got: Vec<u32> = counts(&trials).into_values().collect();
        assert_eq!(got, vec![3, 5, 1]);
    }

    #[test]
    fn both_sides_occur() {
        let builder = DesignMatrixBuilder::uniform(levels(&[1.0]), 200);
        let trials = builder.build(&mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        let left = trials.iter().filter(|t| t.standard_side == Side::Left).count();
        assert!(left > 50 && left < 150, "left = {left}");
    }

    #[test]
    fn rejects_invalid_designs_before_generating() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let empty = DesignMatrixBuilder::uniform(Vec::new(), 10);
        assert_eq!(empty.build(&mut rng).unwrap_err().kind(), ErrorKind::Configuration);

        let zero = DesignMatrixBuilder::uniform(levels(&[1.0]), 0);
        assert_eq!(zero.build(&mut rng).unwrap_err().kind(), ErrorKind::Configuration);

        let dup = DesignMatrixBuilder::uniform(levels(&[1.0, 1.0]), 2);
        assert_eq!(dup.build(&mut rng).unwrap_err().kind(), ErrorKind::Configuration);
    }

    proptest! {
        #[test]
        fn multiset_of_levels_matches_configuration(
            reps in proptest::collection::vec(1u32..12, 1..8),
            seed in any::<u64>(),
        ) {
            let lvls: Vec<StimulusLevel> = (0..reps.len())
                .map(|i| StimulusLevel::new(0.8 + 0.05 * i as f64).unwrap())
                .collect();
            let builder = DesignMatrixBuilder::with_counts(lvls.iter().copied().zip(reps.iter().copied()));
            let trials = builder.build(&mut ChaCha8Rng::seed_from_u64(seed)).unwrap();

            prop_assert_eq!(trials.len(), reps.iter().map(|&r| r as usize).sum::<usize>());
            let got = counts(&trials);
            for (level, expected) in lvls.iter().zip(&reps) {
                prop_assert_eq!(got.get(level).copied(), Some(*expected));
            }
            prop_assert_eq!(got.len(), lvls.len());
        }
    }
}
