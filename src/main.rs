//! Trace-Segments: Main entry point

use anyhow::Context;
use clap::Parser;
use trace_segments::cli::{run, Cli};
use trace_segments::config::{Config, ConfigSource};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)
        .with_context(|| format!("cannot load configuration {}", cli.config.display()))?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.log_level(ConfigSource::Automatic).unwrap_or("warn"))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let output = run(cli.command, &config).await?;
    println!("{output}");
    Ok(())
}
