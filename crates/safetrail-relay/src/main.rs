//! safetrail-relay server binary.
//!
//! Reads `relay.toml` (or the path given with `--config`) layered under
//! `SAFETRAIL_*` environment variables, and serves the relay over HTTP.
//! Alerts are held in memory only.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use safetrail_api::RelayState;
use safetrail_relay::RelayConfig;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Safetrail SOS relay server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "relay.toml")]
  config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let relay_cfg = RelayConfig::load(&cli.config).context("failed to load relay configuration")?;
  let catalog = relay_cfg.catalog()?;
  tracing::info!(
    police = catalog.police.len(),
    hospitals = catalog.hospitals.len(),
    "facility catalog loaded"
  );

  let app = safetrail_relay::router(RelayState::new(catalog));
  let address = relay_cfg.address();

  tracing::info!("Listening on http://{address}");
  tracing::info!("Health check: http://{address}/health");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
