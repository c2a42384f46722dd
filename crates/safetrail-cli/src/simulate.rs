//! `safetrail simulate`: run a reporter and some dashboards in-process.
//!
//! The reporter's [`Session`] and every [`Dashboard`] share one SQLite file
//! as the fallback medium. With `--no-primary` the session has no primary
//! channel and everything travels through the mailbox; otherwise dashboards
//! subscribe to an in-process primary channel.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use safetrail_core::{
  alert::Reporter,
  alert_store::AlertStats,
  channel::{Broadcaster, ChannelMessage, DualChannel, LocalChannel, NoPrimaryChannel},
  dashboard::Dashboard,
  facility::{FacilityCatalog, FacilityKind},
  geo::Location,
  mailbox::Mailbox,
  session::Session,
};
use safetrail_store_sqlite::SqliteKvStore;
use tokio::sync::broadcast;

use crate::render;

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
  /// SQLite file shared by the reporter and the dashboards (in-memory if unset).
  #[arg(long, value_name = "FILE")]
  pub db: Option<PathBuf>,

  /// Run without a primary channel, as a runtime that lacks one would.
  #[arg(long)]
  pub no_primary: bool,

  /// Number of dashboards observing.
  #[arg(long, default_value_t = 2)]
  pub dashboards: usize,

  /// Also mark the alert as sent to the nearest police station and hospital.
  #[arg(long)]
  pub dispatch: bool,

  #[arg(long, default_value = "Asha Rao")]
  pub name: String,

  #[arg(long, default_value = "12.9716", allow_hyphen_values = true)]
  pub lat: f64,

  #[arg(long, default_value = "77.5946", allow_hyphen_values = true)]
  pub lng: f64,
}

type Observer = (Dashboard<SqliteKvStore>, Option<broadcast::Receiver<ChannelMessage>>);

/// Run the simulation and return each dashboard's final statistics.
pub async fn run(args: &SimulateArgs) -> Result<Vec<AlertStats>> {
  let store = match &args.db {
    Some(path) => SqliteKvStore::open(path)
      .await
      .with_context(|| format!("failed to open {}", path.display()))?,
    None => SqliteKvStore::open_in_memory().await?,
  };

  if args.no_primary {
    simulate(NoPrimaryChannel, None, store, args).await
  } else {
    let primary = LocalChannel::new();
    simulate(primary.clone(), Some(&primary), store, args).await
  }
}

async fn simulate<B: Broadcaster>(
  primary: B,
  subscribe_to: Option<&LocalChannel>,
  store: SqliteKvStore,
  args: &SimulateArgs,
) -> Result<Vec<AlertStats>> {
  let mut observers: Vec<Observer> = Vec::with_capacity(args.dashboards);
  for _ in 0..args.dashboards {
    let dashboard = Dashboard::load(Mailbox::new(store.clone())).await?;
    observers.push((dashboard, subscribe_to.map(LocalChannel::subscribe)));
  }

  let location = Location::new(args.lat, args.lng)?;
  let mut session = Session::new(
    Reporter::new(&args.name, "DEMO-0001", "+91-0000000000"),
    location,
    FacilityCatalog::bengaluru(),
    DualChannel::new(primary, Mailbox::new(store.clone())),
  );

  if let Some(delivery) = session.trigger_sos().await? {
    println!("SOS raised via {delivery:?}");
  }
  if args.dispatch {
    session.send_to_facility(FacilityKind::Police).await?;
    session.send_to_facility(FacilityKind::Hospital).await?;
  }
  if let Some(alert) = session.active_alert() {
    println!("reporter  {}", render::alert_line(alert));
  }

  let mut stats = Vec::with_capacity(observers.len());
  for (i, (dashboard, rx)) in observers.iter_mut().enumerate() {
    if let Some(rx) = rx {
      while let Ok(message) = rx.try_recv() {
        dashboard.handle_message(message).await?;
      }
    }
    dashboard.poll_mailbox().await?;
    dashboard.sync_shared_list().await?;

    for alert in dashboard.alerts().iter() {
      println!("dash {i}    {}", render::alert_line(alert));
    }
    println!("dash {i}    {}", render::stats_line(&dashboard.stats()));
    stats.push(dashboard.stats());
  }
  Ok(stats)
}
