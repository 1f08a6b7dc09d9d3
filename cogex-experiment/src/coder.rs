use cogex_core::{KeyChoice, Response, Side, Trial, TrialOutcome};

/// Maps a raw keypress to "test judged longer" (1) or not (0).
///
/// Only the relation between the pressed side and the test side matters, so
/// mirroring both the standard side and the key leaves the response unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseCoder;

impl ResponseCoder {
    pub fn code(standard_side: Side, choice: KeyChoice) -> Response {
        match (standard_side, choice) {
            (Side::Left, KeyChoice::RightKey) => Response::TestLonger,
            (Side::Left, KeyChoice::LeftKey) => Response::StandardLonger,
            (Side::Right, KeyChoice::LeftKey) => Response::TestLonger,
            (Side::Right, KeyChoice::RightKey) => Response::StandardLonger,
        }
    }

    /// Consumes one trial's keypress. The raw key is not retained.
    pub fn outcome(trial: &Trial, choice: KeyChoice) -> TrialOutcome {
        TrialOutcome {
            level: trial.level,
            response: Self::code(trial.standard_side, choice),
        }
    }
}
