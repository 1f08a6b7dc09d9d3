use std::collections::BTreeMap;

use cogex_core::{Error, Result, StimulusLevel, TrialOutcome};
use cogex_experiment::SessionLog;
use serde::{Deserialize, Serialize};

/// Empirical "test longer" rate at one stimulus level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub level: StimulusLevel,
    pub probability: f64,
    pub n: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProbabilityAggregator;

impl ProbabilityAggregator {
    /// One summary per level present in the log, ascending by ratio.
    pub fn aggregate(log: &SessionLog) -> Result<Vec<LevelSummary>> {
        if log.is_empty() {
            return Err(Error::incomplete("session log has no recorded responses"));
        }
        Ok(Self::summarize(log.iter()))
    }

    /// Like [`aggregate`](Self::aggregate), but every expected level must
    /// have at least one response. Fewer than designed is fine.
    pub fn aggregate_expected(
        log: &SessionLog,
        expected: &[StimulusLevel],
    ) -> Result<Vec<LevelSummary>> {
        let summaries = Self::aggregate(log)?;
        for level in expected {
            if !summaries.iter().any(|s| s.level == *level) {
                return Err(Error::incomplete(format!(
                    "level {level} has no recorded responses"
                )));
            }
        }
        Ok(summaries)
    }

    fn summarize<'a>(outcomes: impl Iterator<Item = &'a TrialOutcome>) -> Vec<LevelSummary> {
        let mut tally: BTreeMap<StimulusLevel, (u64, usize)> = BTreeMap::new();
        for outcome in outcomes {
            let entry = tally.entry(outcome.level).or_default();
            entry.0 += u64::from(outcome.response.as_u8());
            entry.1 += 1;
        }
        tally
            .into_iter()
            .map(|(level, (longer, n))| LevelSummary {
                level,
                probability: longer as f64 / n as f64,
                n,
            })
            .collect()
    }
}
