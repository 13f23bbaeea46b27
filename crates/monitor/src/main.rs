//! Monitor binary that tails TronGrid for deposits into monitored addresses.

use std::io;

use tracing::{info, warn};
use tron_deposit_domain::config::MonitorConfig;
use tron_deposit_domain::services::telemetry::{init_telemetry, TelemetryConfig};
use tron_deposit_monitor::{run_monitor, MonitorError, TronGridClient};
use tron_deposit_storage::SeaOrmStorage;

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[monitor] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), MonitorError> {
    let config = MonitorConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("MONITOR");
    init_telemetry(&telemetry_config)?;
    let storage = SeaOrmStorage::connect(config.database_url()).await?;
    let source = TronGridClient::from_config(&config)?;
    run_monitor(&config, storage, source, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => warn!(?err, "failed to listen for shutdown signal"),
    }
}
