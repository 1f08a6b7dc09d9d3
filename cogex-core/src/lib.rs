pub mod error;
pub mod phase;
pub mod psychometric;
pub mod stimulus;
pub mod trial;

pub use error::{Error, ErrorKind, Result};
pub use phase::SessionPhase;
pub use psychometric::{PsychometricFunction, standard_normal_cdf, standard_normal_pdf};
pub use stimulus::{JND_QUANTILE_Z, StimulusLevel, StimulusPair};
pub use trial::{KeyChoice, Response, Side, Trial, TrialOutcome};
