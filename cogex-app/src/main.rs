mod app;
mod cli;
mod console;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use app::App;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let app = App::new(cli::Cli::parse())?;
    app.run()?;

    Ok(())
}
