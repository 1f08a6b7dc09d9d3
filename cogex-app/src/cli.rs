use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cogex")]
#[command(about = "2AFC length discrimination: run sessions, fit PSE and JND")]
#[command(version)]
pub struct Cli {
    /// Experiment configuration (JSON); defaults to the reference session
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DesignOverrides {
    /// Seed for side assignment and shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Repetitions per stimulus level
    #[arg(long)]
    pub trials_per_level: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the randomized trial list as JSON
    Design {
        #[command(flatten)]
        overrides: DesignOverrides,
    },

    /// Run an interactive console session
    Run {
        #[command(flatten)]
        overrides: DesignOverrides,

        /// Session log output (CSV)
        #[arg(short, long, default_value = "my_psychophysics_data.csv")]
        output: PathBuf,

        /// Append and flush each trial as it is recorded
        #[arg(long)]
        incremental: bool,
    },

    /// Run a session against a simulated observer
    Simulate {
        #[command(flatten)]
        overrides: DesignOverrides,

        /// Observer's true PSE
        #[arg(long, default_value_t = 1.0)]
        mu: f64,

        /// Observer's true noise (sigma)
        #[arg(long, default_value_t = 0.08)]
        sigma: f64,

        /// Seed for the observer's judgments
        #[arg(long, default_value_t = 0)]
        observer_seed: u64,

        /// Session log output (CSV)
        #[arg(short, long, default_value = "my_psychophysics_data.csv")]
        output: PathBuf,
    },

    /// Fit the psychometric function to a session log
    Analyze {
        /// Session log input (CSV)
        #[arg(default_value = "my_psychophysics_data.csv")]
        input: PathBuf,

        /// Write the plot data (summaries, fitted curve, markers) as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Initial PSE guess; overrides the configuration
        #[arg(long)]
        mu0: Option<f64>,

        /// Initial sigma guess; overrides the configuration
        #[arg(long)]
        sigma0: Option<f64>,

        /// Require a response at every reference level; always on with --config
        #[arg(long)]
        strict: bool,
    },
}
