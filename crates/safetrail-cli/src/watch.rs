//! `safetrail watch`: follow a relay by polling `GET /alerts`.
//!
//! Each poll is reconciled into a local [`AlertStore`]; only the difference
//! from the previous poll is printed.

use std::time::Duration;

use anyhow::Result;
use safetrail_core::{
  alert::Alert,
  alert_store::{AlertStore, Reconciled},
};
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::{client::ApiClient, render};

/// One difference between two polls.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
  New(Alert),
  Updated(Alert),
  Deleted(Alert),
}

/// Bring `store` in line with `fetched` and report what changed.
pub fn reconcile(store: &mut AlertStore, fetched: Vec<Alert>) -> Vec<Change> {
  let mut changes = Vec::new();

  let gone: Vec<String> = store
    .iter()
    .filter(|known| !fetched.iter().any(|a| a.id() == known.id()))
    .map(|known| known.id().to_owned())
    .collect();
  for id in gone {
    if let Ok(alert) = store.delete(&id) {
      changes.push(Change::Deleted(alert));
    }
  }

  for alert in fetched {
    match store.upsert(&alert) {
      Reconciled::Inserted => changes.push(Change::New(alert)),
      Reconciled::Updated => changes.push(Change::Updated(alert)),
      Reconciled::Unchanged => {}
    }
  }

  changes
}

/// Poll until interrupted.
pub async fn run(client: &ApiClient, every: Duration) -> Result<()> {
  let mut store = AlertStore::new();
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      _ = ticker.tick() => {}
      _ = tokio::signal::ctrl_c() => return Ok(()),
    }

    match client.list().await {
      Ok(fetched) => {
        for change in reconcile(&mut store, fetched) {
          match change {
            Change::New(alert) => println!("NEW      {}", render::alert_line(&alert)),
            Change::Updated(alert) => println!("UPDATED  {}", render::alert_line(&alert)),
            Change::Deleted(alert) => println!("DELETED  {}", render::alert_line(&alert)),
          }
        }
      }
      Err(e) => warn!(error = %e, "poll failed"),
    }
  }
}

#[cfg(test)]
mod tests {
  use safetrail_core::{
    alert::{AlertPatch, AlertStatus, Reporter},
    builder::build_alert,
    facility::FacilityCatalog,
    geo::Location,
  };

  use super::*;

  fn alert() -> Alert {
    build_alert(
      &Reporter::new("Asha Rao", "P1234567", "+91-9876543210"),
      Location::new(12.9716, 77.5946).unwrap(),
      &FacilityCatalog::bengaluru(),
    )
    .unwrap()
  }

  #[test]
  fn successive_polls_report_only_differences() {
    let mut store = AlertStore::new();
    let a = alert();
    let b = alert();

    let changes = reconcile(&mut store, vec![a.clone(), b.clone()]);
    assert_eq!(changes, vec![Change::New(a.clone()), Change::New(b.clone())]);
    assert!(reconcile(&mut store, vec![a.clone(), b.clone()]).is_empty());

    let mut resolved = a.clone();
    resolved.apply(&AlertPatch::status(AlertStatus::Resolved));
    let changes = reconcile(&mut store, vec![resolved.clone()]);
    assert_eq!(changes, vec![Change::Deleted(b), Change::Updated(resolved)]);
    assert_eq!(store.len(), 1);
  }
}
