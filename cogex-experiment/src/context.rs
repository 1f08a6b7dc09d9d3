use cogex_core::{Error, Result, SessionPhase, Trial, TrialOutcome};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::coder::ResponseCoder;
use crate::config::ExperimentConfig;
use crate::presenter::Presenter;
use crate::session::{SessionLog, SessionLogWriter};

/// Everything one session owns: its design, the outcomes so far, and an
/// optional sink that persists each outcome as soon as it is coded.
pub struct SessionContext {
    phase: SessionPhase,
    config: ExperimentConfig,
    seed: Option<u64>,
    trials: Vec<Trial>,
    trial_number: usize,
    log: SessionLog,
    sink: Option<SessionLogWriter>,
}

impl SessionContext {
    /// Builds the design with the configured seed, or a fresh one which is
    /// logged so the session can be replayed.
    pub fn from_config(config: ExperimentConfig) -> Result<Self> {
        let seed = config.seed.unwrap_or_else(rand::random);
        info!(seed, "session seed");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ctx = Self::new(config, &mut rng)?;
        ctx.seed = Some(seed);
        Ok(ctx)
    }

    pub fn new<R: Rng + ?Sized>(config: ExperimentConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let trials = config.design()?.build(rng)?;
        Ok(Self {
            phase: SessionPhase::default(),
            log: SessionLog::with_capacity(trials.len()),
            config,
            seed: None,
            trials,
            trial_number: 0,
            sink: None,
        })
    }

    pub fn with_sink(mut self, sink: SessionLogWriter) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn is_complete(&self) -> bool {
        self.trial_number >= self.trials.len()
    }

    /// (completed, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.trial_number, self.trials.len())
    }

    /// Presents the next trial, waits for its keypress and codes it. Returns
    /// `None` once the design is exhausted.
    pub fn run_trial<P: Presenter + ?Sized>(
        &mut self,
        presenter: &mut P,
    ) -> Result<Option<TrialOutcome>> {
        if !self.phase.accepts_outcomes() {
            return Err(Error::config("session already finalized"));
        }
        let Some(trial) = self.trials.get(self.trial_number).copied() else {
            return Ok(None);
        };
        if self.phase == SessionPhase::Created {
            self.advance_phase();
        }

        let pair = trial.stimulus_pair(self.config.standard_length);
        let choice = presenter.present(&trial, pair)?;
        let outcome = ResponseCoder::outcome(&trial, choice);

        if let Some(sink) = self.sink.as_mut() {
            sink.append(&outcome)?;
        }
        self.log.push(outcome);
        self.trial_number += 1;

        debug!(
            trial = self.trial_number,
            total = self.trials.len(),
            ratio = trial.level.ratio(),
            standard_side = ?trial.standard_side,
            response = outcome.response.as_u8(),
            "trial recorded"
        );
        Ok(Some(outcome))
    }

    /// Runs every remaining trial.
    pub fn run<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> Result<()> {
        while self.run_trial(presenter)?.is_some() {}
        Ok(())
    }

    /// Closes the session and hands over its log. Partial sessions are
    /// allowed; the completed trials stay valid for analysis.
    pub fn finalize(mut self) -> Result<SessionLog> {
        while self.advance_phase() {}
        if let Some(sink) = self.sink.take() {
            sink.into_inner()?;
        }
        let (done, total) = self.progress();
        if done < total {
            info!(done, total, "session finalized early");
        } else {
            info!(trials = done, "session complete");
        }
        Ok(self.log)
    }

    fn advance_phase(&mut self) -> bool {
        if let Some(next) = self.phase.next() {
            self.phase = next;
            true
        } else {
            false
        }
    }
}
