pub mod aggregate;
pub mod fit;
pub mod metrics;
pub mod report;
pub mod solver;

pub use aggregate::{LevelSummary, ProbabilityAggregator};
pub use fit::{FitResult, GaussianCdfModel, InitialGuess, PsychometricFitter};
pub use metrics::{MetricExtractor, Metrics};
pub use report::{AnalysisReport, CurvePoint, Markers, analyze};
pub use solver::{CurveModel, LeastSquaresSolver, LevenbergMarquardt, Solution};
