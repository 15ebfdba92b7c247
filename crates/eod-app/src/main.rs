//! moex-eod - Entry Point

use anyhow::Result;
use clap::Parser;
use eod_app::{AppConfig, Application, Cli};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine config path: CLI arg > EOD_CONFIG env var > default
    let (config_path, _) = AppConfig::resolve_path(cli.config.as_deref());
    let config = AppConfig::load(cli.config.as_deref())?;

    eod_telemetry::init_logging(&config.telemetry.log_level)?;
    info!(config_path = %config_path, "Starting moex-eod v{}", env!("CARGO_PKG_VERSION"));

    let app = Application::new(config)?;
    let result = app.execute(&cli.command, cli.format()).await;
    app.shutdown().await;

    if cli.dump_metrics {
        eprintln!("{}", eod_telemetry::Metrics::gather()?);
    }

    println!("{}", result?);
    Ok(())
}
