use cogex_analysis::{InitialGuess, MetricExtractor, ProbabilityAggregator, PsychometricFitter, analyze};
use cogex_core::{ErrorKind, PsychometricFunction};
use cogex_experiment::{ExperimentConfig, SessionContext, SessionLog, SimulatedObserver};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn simulate(config: ExperimentConfig, mu: f64, sigma: f64, seed: u64) -> SessionLog {
    let function = PsychometricFunction::new(mu, sigma).unwrap();
    let mut observer = SimulatedObserver::new(function, ChaCha8Rng::seed_from_u64(seed));
    let mut ctx = SessionContext::from_config(config).unwrap();
    ctx.run(&mut observer).unwrap();
    ctx.finalize().unwrap()
}

fn large_session() -> ExperimentConfig {
    ExperimentConfig {
        trials_per_level: 200,
        seed: Some(2024),
        ..ExperimentConfig::default()
    }
}

#[test]
fn simulated_observer_parameters_are_recovered() {
    let config = large_session();
    let expected = config.stimulus_levels().unwrap();
    let log = simulate(config, 1.02, 0.06, 99);
    assert_eq!(log.len(), 7 * 200);

    let report = analyze(&log, Some(&expected), InitialGuess::default()).unwrap();
    assert!((report.fit.mu - 1.02).abs() < 0.015, "mu = {}", report.fit.mu);
    assert!((report.fit.sigma - 0.06).abs() < 0.025, "sigma = {}", report.fit.sigma);
    assert!(report.standard_errors.pse > 0.0 && report.standard_errors.pse < 0.05);
    assert!(report.summaries.iter().all(|s| s.n == 200));
}

#[test]
fn sharp_observer_fits_from_reference_session() {
    let mut mus = Vec::new();
    for seed in 0..25 {
        let config = ExperimentConfig {
            seed: Some(seed),
            ..ExperimentConfig::default()
        };
        let expected = config.stimulus_levels().unwrap();
        let log = simulate(config, 1.0, 0.03, 1000 + seed);
        assert_eq!(log.len(), 7 * 10);
        match analyze(&log, Some(&expected), InitialGuess::default()) {
            Ok(report) => mus.push(report.fit.mu),
            // A session can come out as a clean step (e.g. 0, 0, 0, 0.5, 1, 1, 1),
            // whose least-squares optimum is σ → 0.
            Err(e) => assert_eq!(e.kind(), ErrorKind::FitConvergence, "seed {seed}: {e}"),
        }
    }
    assert!(mus.len() >= 24, "only {} of 25 sessions fitted", mus.len());
    let mean = mus.iter().sum::<f64>() / mus.len() as f64;
    assert!((mean - 1.0).abs() < 0.01, "mean mu = {mean}");
}

#[test]
fn persisted_log_analyzes_identically() {
    let log = simulate(
        ExperimentConfig {
            seed: Some(7),
            ..ExperimentConfig::default()
        },
        1.0,
        0.08,
        3,
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("my_psychophysics_data.csv");
    log.write_csv(&path).unwrap();
    let reloaded = SessionLog::read_csv(&path).unwrap();
    assert_eq!(reloaded, log);

    let a = ProbabilityAggregator::aggregate(&log).unwrap();
    let b = ProbabilityAggregator::aggregate(&reloaded).unwrap();
    assert_eq!(a, b);
}

#[test]
fn partial_session_is_still_fittable() {
    let config = large_session();
    let full = simulate(config, 1.0, 0.07, 5);
    let partial: SessionLog = full.iter().take(700).copied().collect();
    let summaries = ProbabilityAggregator::aggregate(&partial).unwrap();
    assert_eq!(summaries.len(), 7);

    let fit = PsychometricFitter::new()
        .fit(&summaries, InitialGuess::default())
        .unwrap();
    let metrics = MetricExtractor::extract(&fit).unwrap();
    assert!(metrics.jnd > 0.0);
    assert!((metrics.pse - 1.0).abs() < 0.03);
}

#[test]
fn missing_level_stops_analysis() {
    let config = ExperimentConfig {
        seed: Some(1),
        ..ExperimentConfig::default()
    };
    let expected = config.stimulus_levels().unwrap();
    let log = simulate(config, 1.0, 0.08, 1);
    let dropped = expected[0];
    let without: SessionLog = log.iter().filter(|o| o.level != dropped).copied().collect();
    let err = analyze(&without, Some(&expected), InitialGuess::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompleteData);
}
