//! secret-injector - Inject secrets from files into environment variables
//!
//! Usage: secret-injector [--verbose] -- COMMAND [ARGS...]

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use secret_injector::{inject, Cli, InjectorConfig, Supervisor};

fn main() -> Result<()> {
    // Usage errors exit here, before the environment is touched
    let cli = Cli::parse();
    let config = InjectorConfig::from_cli(cli)?;

    // Logs go to stderr; stdout belongs to the child
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Single-threaded here: no other thread can observe the environment mid-write
    inject(config.verbose);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let supervisor = Supervisor::from_config(&config);
    // Start and wait failures bubble out as errors (exit status 1)
    let code = rt.block_on(supervisor.run())?;

    std::process::exit(code);
}
