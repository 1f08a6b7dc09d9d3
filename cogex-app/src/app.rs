use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use cogex_analysis::{AnalysisReport, InitialGuess, MetricExtractor, analyze};
use cogex_core::{PsychometricFunction, StimulusLevel};
use cogex_experiment::{
    ExperimentConfig, SessionContext, SessionLog, SessionLogWriter, SimulatedObserver,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, DesignOverrides};
use crate::console::ConsolePresenter;

pub struct App {
    config: ExperimentConfig,
    /// Set when `--config` named the levels explicitly.
    levels_pinned: bool,
    command: Commands,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => ExperimentConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        Ok(Self {
            config,
            levels_pinned: cli.config.is_some(),
            command: cli.command,
        })
    }

    pub fn run(self) -> Result<()> {
        let Self {
            config,
            levels_pinned,
            command,
        } = self;
        match command {
            Commands::Design { overrides } => print_design(apply(config, &overrides)?),
            Commands::Run {
                overrides,
                output,
                incremental,
            } => run_console(apply(config, &overrides)?, &output, incremental),
            Commands::Simulate {
                overrides,
                mu,
                sigma,
                observer_seed,
                output,
            } => {
                let function = PsychometricFunction::new(mu, sigma)
                    .context("simulated observer parameters")?;
                run_simulated(apply(config, &overrides)?, function, observer_seed, &output)
            }
            Commands::Analyze {
                input,
                report,
                mu0,
                sigma0,
                strict,
            } => {
                let guess = InitialGuess::new(
                    mu0.unwrap_or(config.initial_mu),
                    sigma0.unwrap_or(config.initial_sigma),
                )?;
                let levels = config.stimulus_levels()?;
                let enforce = strict || levels_pinned;
                run_analysis(&input, &levels, enforce, guess, report.as_deref())
            }
        }
    }
}

fn apply(mut config: ExperimentConfig, overrides: &DesignOverrides) -> Result<ExperimentConfig> {
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if let Some(n) = overrides.trials_per_level {
        config.trials_per_level = n;
        config.per_level_repetitions = None;
    }
    config.validate()?;
    Ok(config)
}

fn print_design(config: ExperimentConfig) -> Result<()> {
    let ctx = SessionContext::from_config(config)?;
    println!("{}", serde_json::to_string_pretty(ctx.trials())?);
    Ok(())
}

fn run_console(config: ExperimentConfig, output: &Path, incremental: bool) -> Result<()> {
    println!("=== 2AFC LENGTH DISCRIMINATION ===");
    println!("Levels: {:?}", config.levels);
    println!("Trials: {}", config.design()?.total_trials());

    let mut ctx = SessionContext::from_config(config)?;
    if incremental {
        let sink = SessionLogWriter::create(output)
            .with_context(|| format!("creating {}", output.display()))?;
        ctx = ctx.with_sink(sink);
    }

    let stdin = io::stdin();
    let mut presenter = ConsolePresenter::new(ctx.config(), stdin.lock(), io::stdout());
    presenter.instructions()?;
    let outcome = ctx.run(&mut presenter);

    let (done, total) = ctx.progress();
    let log = ctx.finalize()?;
    if !incremental {
        persist(&log, output)?;
    }

    match outcome {
        Ok(()) => {
            println!("\nSession Complete. Data saved.");
            Ok(())
        }
        Err(err) => {
            warn!(done, total, "session stopped early: {err}");
            println!("\nSession stopped after {done}/{total} trials. Data saved.");
            Ok(())
        }
    }
}

fn run_simulated(
    config: ExperimentConfig,
    function: PsychometricFunction,
    observer_seed: u64,
    output: &Path,
) -> Result<()> {
    let mut observer = SimulatedObserver::new(function, ChaCha8Rng::seed_from_u64(observer_seed));
    let mut ctx = SessionContext::from_config(config)?;
    ctx.run(&mut observer)?;
    let log = ctx.finalize()?;
    persist(&log, output)?;
    println!(
        "Simulated {} trials (mu = {}, sigma = {}) -> {}",
        log.len(),
        function.mu,
        function.sigma,
        output.display()
    );
    Ok(())
}

fn persist(log: &SessionLog, output: &Path) -> Result<()> {
    log.write_csv(output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(rows = log.len(), path = %output.display(), "session log saved");
    Ok(())
}

/// Missing configured levels fail the analysis when `enforce` is set and are
/// only logged otherwise.
fn run_analysis(
    input: &Path,
    levels: &[StimulusLevel],
    enforce: bool,
    guess: InitialGuess,
    report_path: Option<&Path>,
) -> Result<()> {
    let log = SessionLog::read_csv(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let expected = if enforce {
        Some(levels)
    } else {
        let missing: Vec<String> = levels
            .iter()
            .filter(|level| !log.iter().any(|o| o.level == **level))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            warn!(
                missing = %missing.join(", "),
                "reference levels absent from the log; pass --config or --strict to require them"
            );
        }
        None
    };
    let report: AnalysisReport = analyze(&log, expected, guess)?;

    for s in &report.summaries {
        println!(
            "  ratio {:>6.3}  p = {:.3}  (n = {})",
            s.level.ratio(),
            s.probability,
            s.n
        );
    }
    let (se_pse, se_jnd) = MetricExtractor::standard_errors(&report.fit);
    println!("--- RESULTS ---");
    println!("{}", report.metrics);
    println!("SE: PSE ± {se_pse:.4}, JND ± {se_jnd:.4}");

    if let Some(path) = report_path {
        report
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "analysis report saved");
    }
    Ok(())
}
