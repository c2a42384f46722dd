//! `safetrail`: command-line client for the Safetrail relay.
//!
//! # Usage
//!
//! ```text
//! safetrail sos --name "Asha Rao" --id-number P1234567 --contact +91-9876543210 --lat 12.9716 --lng 77.5946
//! safetrail list
//! safetrail resolve alert_1727000000000_k3j9x0a1b
//! safetrail watch --interval 5
//! safetrail simulate --no-primary --dashboards 3
//! safetrail --url http://relay.local:3000 health
//! ```

mod client;
mod render;
mod simulate;
mod watch;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use safetrail_core::{
  alert::{AlertPatch, AlertStatus, Reporter},
  builder::build_alert,
  facility::FacilityCatalog,
  geo::Location,
};
use serde::Deserialize;
use simulate::SimulateArgs;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:3000";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "safetrail", about = "Command-line client for the Safetrail SOS relay")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the relay (default: http://localhost:3000).
  #[arg(long, env = "SAFETRAIL_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Raise an SOS: resolve the nearest facilities locally and submit it.
  Sos(SosArgs),
  /// List every alert the relay holds.
  List,
  /// Patch the mutable fields of an alert.
  Update {
    id:               String,
    #[arg(long)]
    status:           Option<String>,
    #[arg(long)]
    sent_to_police:   Option<bool>,
    #[arg(long)]
    sent_to_hospital: Option<bool>,
  },
  /// Mark an alert resolved.
  Resolve { id: String },
  /// Delete an alert.
  Delete { id: String },
  /// Check that the relay is up.
  Health,
  /// Poll the relay and print alerts as they appear, change or disappear.
  Watch {
    /// Seconds between polls.
    #[arg(long, default_value_t = 5)]
    interval: u64,
  },
  /// Run a reporter and dashboards locally over a SQLite mailbox.
  Simulate(SimulateArgs),
}

#[derive(ClapArgs, Debug)]
struct SosArgs {
  #[arg(long)]
  name:      String,
  #[arg(long)]
  id_number: String,
  #[arg(long)]
  contact:   String,
  #[arg(long, allow_hyphen_values = true)]
  lat:       f64,
  #[arg(long, allow_hyphen_values = true)]
  lng:       f64,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
  };
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Sos(sos) => {
      let location = Location::new(sos.lat, sos.lng)?;
      let reporter = Reporter::new(sos.name, sos.id_number, sos.contact);
      let alert = build_alert(&reporter, location, &FacilityCatalog::bengaluru())?;
      let alert_id = client.submit(&alert).await?;
      println!("submitted {alert_id}");
      println!("{}", render::alert_line(&alert));
    }
    Command::List => {
      let alerts = client.list().await?;
      for alert in &alerts {
        println!("{}", render::alert_line(alert));
      }
      println!("{} alert(s)", alerts.len());
    }
    Command::Update { id, status, sent_to_police, sent_to_hospital } => {
      let patch = AlertPatch {
        status: status.map(AlertStatus::from),
        sent_to_police,
        sent_to_hospital,
      };
      anyhow::ensure!(!patch.is_empty(), "nothing to update");
      let alert = client.update(&id, &patch).await?;
      println!("{}", render::alert_line(&alert));
    }
    Command::Resolve { id } => {
      let alert = client.update(&id, &AlertPatch::status(AlertStatus::Resolved)).await?;
      println!("{}", render::alert_line(&alert));
    }
    Command::Delete { id } => {
      let alert = client.delete(&id).await?;
      println!("deleted {}", render::alert_line(&alert));
    }
    Command::Health => {
      let health = client.health().await?;
      println!("{} ({} alerts, {})", health.message, health.alerts_count, health.timestamp);
    }
    Command::Watch { interval } => {
      watch::run(&client, Duration::from_secs(interval.max(1))).await?;
    }
    Command::Simulate(sim) => {
      simulate::run(&sim).await?;
    }
  }

  Ok(())
}
