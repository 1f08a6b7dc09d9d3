pub mod coder;
pub mod config;
pub mod context;
pub mod design;
pub mod presenter;
pub mod session;

pub use coder::ResponseCoder;
pub use config::ExperimentConfig;
pub use context::SessionContext;
pub use design::DesignMatrixBuilder;
pub use presenter::{Presenter, SimulatedObserver};
pub use session::{SessionLog, SessionLogWriter};
