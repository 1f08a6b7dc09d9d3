use cogex_core::{KeyChoice, PsychometricFunction, Result, StimulusPair, Trial};
use rand::Rng;

/// External presentation collaborator: shows one trial and blocks until
/// exactly one of the two response keys is pressed.
pub trait Presenter {
    fn present(&mut self, trial: &Trial, pair: StimulusPair) -> Result<KeyChoice>;
}

/// Synthetic subject whose judgments follow a known psychometric function.
/// Presses the key on whichever side it perceived as longer.
pub struct SimulatedObserver<R: Rng> {
    pub function: PsychometricFunction,
    rng: R,
}

impl<R: Rng> SimulatedObserver<R> {
    pub fn new(function: PsychometricFunction, rng: R) -> Self {
        Self { function, rng }
    }
}

impl<R: Rng> Presenter for SimulatedObserver<R> {
    fn present(&mut self, trial: &Trial, _pair: StimulusPair) -> Result<KeyChoice> {
        let p = self.function.probability(trial.level.ratio()).clamp(0.0, 1.0);
        let longer = if self.rng.random_bool(p) {
            trial.test_side()
        } else {
            trial.standard_side
        };
        Ok(KeyChoice::for_side(longer))
    }
}
