//! Events exchanged with the relay over its persistent connection.

use serde::{Deserialize, Serialize};

use crate::{alert::Alert, geo::Location};

/// Relay → observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RelayEvent {
  /// Snapshot sent once to an observer that joins.
  ExistingAlerts(Vec<Alert>),
  NewSosAlert(Alert),
  AlertUpdated(Alert),
  /// Carries the id of the removed alert.
  AlertDeleted(String),
  LocationUpdate(Location),
}

/// Observer → relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
  JoinAdmin,
  LocationUpdate(Location),
}
