//! The fallback channel: single-slot mailboxes and the shared alert list,
//! laid over a [`KeyValueStore`].
//!
//! Each mailbox key holds only the most recent envelope. A reader that misses
//! two writes in a row never sees the first one; readers diff what they find
//! against what they last processed.

use chrono::Utc;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{Error, Result, alert::Alert, geo::Location, store::KeyValueStore};

/// The full alert list kept by each process on the device.
pub const SOS_ALERTS_KEY: &str = "sosAlerts";
/// Mailbox for the latest alert broadcast.
pub const SOS_ALERT_BROADCAST_KEY: &str = "sosAlertBroadcast";
/// Mailbox for the latest location broadcast.
pub const LOCATION_UPDATE_BROADCAST_KEY: &str = "locationUpdateBroadcast";

/// A mailbox write: the payload plus the sender's wall-clock time in unix
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
  pub timestamp: i64,
  pub data:      T,
}

impl<T> Envelope<T> {
  pub fn now(data: T) -> Self { Self { timestamp: Utc::now().timestamp_millis(), data } }
}

/// Typed access to the fallback keys of one store.
#[derive(Debug, Clone)]
pub struct Mailbox<K> {
  store: K,
}

impl<K: KeyValueStore> Mailbox<K> {
  pub fn new(store: K) -> Self { Self { store } }

  pub fn store(&self) -> &K { &self.store }

  // ── Single-slot mailboxes ─────────────────────────────────────────────

  /// Overwrite the alert mailbox with `alert`.
  pub async fn post_alert(&self, alert: &Alert) -> Result<Envelope<Alert>> {
    let envelope = Envelope::now(alert.clone());
    self.write_json(SOS_ALERT_BROADCAST_KEY, &envelope).await?;
    Ok(envelope)
  }

  /// Overwrite the location mailbox with `location`.
  pub async fn post_location(&self, location: Location) -> Result<Envelope<Location>> {
    let envelope = Envelope::now(location);
    self.write_json(LOCATION_UPDATE_BROADCAST_KEY, &envelope).await?;
    Ok(envelope)
  }

  pub async fn latest_alert(&self) -> Result<Option<Envelope<Alert>>> {
    self.read_json(SOS_ALERT_BROADCAST_KEY).await
  }

  pub async fn latest_location(&self) -> Result<Option<Envelope<Location>>> {
    self.read_json(LOCATION_UPDATE_BROADCAST_KEY).await
  }

  // ── Shared alert list ─────────────────────────────────────────────────

  /// The persisted alert list; missing or malformed reads as empty.
  pub async fn alerts(&self) -> Result<Vec<Alert>> {
    Ok(self.read_json(SOS_ALERTS_KEY).await?.unwrap_or_default())
  }

  pub async fn save_alerts(&self, alerts: &[Alert]) -> Result<()> {
    self.write_json(SOS_ALERTS_KEY, alerts).await
  }

  /// Insert `alert` into the persisted list, or overwrite the entry with the
  /// same id.
  pub async fn record_alert(&self, alert: &Alert) -> Result<()> {
    let mut alerts = self.alerts().await?;
    match alerts.iter_mut().find(|a| a.id() == alert.id()) {
      Some(existing) => *existing = alert.clone(),
      None => alerts.push(alert.clone()),
    }
    self.save_alerts(&alerts).await
  }

  /// Drop the entry with `id` from the persisted list, if present.
  pub async fn forget_alert(&self, id: &str) -> Result<()> {
    let mut alerts = self.alerts().await?;
    let before = alerts.len();
    alerts.retain(|a| a.id() != id);
    if alerts.len() == before {
      return Ok(());
    }
    self.save_alerts(&alerts).await
  }

  // ── JSON helpers ──────────────────────────────────────────────────────

  async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    self.store.set(key, json).await.map_err(Error::store)
  }

  /// Read and decode `key`. Malformed content is logged and treated as absent.
  async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let Some(raw) = self.store.get(key).await.map_err(Error::store)? else {
      return Ok(None);
    };
    match serde_json::from_str(&raw) {
      Ok(value) => Ok(Some(value)),
      Err(e) => {
        warn!(key, error = %e, "ignoring malformed persisted value");
        Ok(None)
      }
    }
  }
}
