//! An observer: keeps an [`AlertStore`] current from every delivery path.
//!
//! A dashboard may learn about the same alert from the primary channel, the
//! alert mailbox, the shared `sosAlerts` list and the relay. All of them feed
//! [`AlertStore::upsert`] / [`AlertStore::insert`], so an alert is recorded
//! once no matter how many paths deliver it.

use tracing::{debug, info};

use crate::{
  Error, Result,
  alert::{Alert, AlertPatch, AlertStatus},
  alert_store::{AlertStats, AlertStore, Reconciled},
  channel::ChannelMessage,
  event::RelayEvent,
  geo::Location,
  mailbox::{Envelope, Mailbox},
  store::KeyValueStore,
};

/// What an incoming message did to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
  Alert { id: String, change: Reconciled },
  Deleted(String),
  Location(Location),
}

pub struct Dashboard<K> {
  mailbox:       Mailbox<K>,
  alerts:        AlertStore,
  last_location: Option<Location>,
  seen_alert:    Option<Envelope<Alert>>,
  seen_location: Option<Envelope<Location>>,
}

impl<K: KeyValueStore> Dashboard<K> {
  /// Start a dashboard from the alerts already persisted in `mailbox`.
  ///
  /// The envelopes currently in the single-slot mailboxes count as seen:
  /// anything they carry that is still live is already in the shared list,
  /// and an alert deleted from that list must not come back through a stale
  /// mailbox. Only writes made after loading are picked up by
  /// [`Dashboard::poll_mailbox`].
  pub async fn load(mailbox: Mailbox<K>) -> Result<Self> {
    let alerts = AlertStore::from_alerts(mailbox.alerts().await?);
    let seen_alert = mailbox.latest_alert().await?;
    let seen_location = mailbox.latest_location().await?;
    debug!(count = alerts.len(), "dashboard loaded persisted alerts");
    Ok(Self {
      last_location: seen_location.as_ref().map(|envelope| envelope.data),
      mailbox,
      alerts,
      seen_alert,
      seen_location,
    })
  }

  pub fn alerts(&self) -> &AlertStore { &self.alerts }

  pub fn stats(&self) -> AlertStats { self.alerts.stats() }

  /// The most recent reporter location seen on any path.
  pub fn last_location(&self) -> Option<Location> { self.last_location }

  // ── Delivery paths ────────────────────────────────────────────────────

  /// Handle a message from the primary channel.
  pub async fn handle_message(&mut self, message: ChannelMessage) -> Result<Observed> {
    match message {
      ChannelMessage::SosAlert(alert) => self.observe_alert(&alert).await,
      ChannelMessage::LocationUpdate(location) => Ok(self.observe_location(location)),
    }
  }

  /// Read both single-slot mailboxes and process whatever changed since the
  /// previous poll.
  pub async fn poll_mailbox(&mut self) -> Result<Vec<Observed>> {
    let mut observed = Vec::new();

    if let Some(envelope) = self.mailbox.latest_alert().await?
      && self.seen_alert.as_ref() != Some(&envelope)
    {
      observed.push(self.observe_alert(&envelope.data).await?);
      self.seen_alert = Some(envelope);
    }

    if let Some(envelope) = self.mailbox.latest_location().await?
      && self.seen_location.as_ref() != Some(&envelope)
    {
      observed.push(self.observe_location(envelope.data));
      self.seen_location = Some(envelope);
    }

    Ok(observed)
  }

  /// Insert every alert in the shared `sosAlerts` list this dashboard does
  /// not know yet. Returns the ids that were new.
  pub async fn sync_shared_list(&mut self) -> Result<Vec<String>> {
    let mut added = Vec::new();
    for alert in self.mailbox.alerts().await? {
      let id = alert.id().to_owned();
      if self.alerts.insert(alert) {
        info!(alert_id = %id, "new SOS alert from shared list");
        added.push(id);
      }
    }
    Ok(added)
  }

  /// Apply an event received from the relay.
  pub async fn apply_relay_event(&mut self, event: RelayEvent) -> Result<Vec<Observed>> {
    match event {
      RelayEvent::ExistingAlerts(alerts) => {
        let mut observed = Vec::with_capacity(alerts.len());
        for alert in &alerts {
          observed.push(self.observe_alert(alert).await?);
        }
        Ok(observed)
      }
      RelayEvent::NewSosAlert(alert) | RelayEvent::AlertUpdated(alert) => {
        Ok(vec![self.observe_alert(&alert).await?])
      }
      RelayEvent::AlertDeleted(id) => match self.delete(&id).await {
        Ok(_) => Ok(vec![Observed::Deleted(id)]),
        Err(Error::AlertNotFound(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
      },
      RelayEvent::LocationUpdate(location) => Ok(vec![self.observe_location(location)]),
    }
  }

  // ── Observer actions ──────────────────────────────────────────────────

  pub async fn mark_resolved(&mut self, id: &str) -> Result<Alert> {
    let alert = self
      .alerts
      .update_status(id, &AlertPatch::status(AlertStatus::Resolved))?
      .clone();
    self.mailbox.record_alert(&alert).await?;
    info!(alert_id = id, "alert resolved");
    Ok(alert)
  }

  pub async fn delete(&mut self, id: &str) -> Result<Alert> {
    let alert = self.alerts.delete(id)?;
    self.mailbox.forget_alert(id).await?;
    info!(alert_id = id, "alert deleted");
    Ok(alert)
  }

  // ── Internals ─────────────────────────────────────────────────────────

  async fn observe_alert(&mut self, alert: &Alert) -> Result<Observed> {
    let change = self.alerts.upsert(alert);
    match change {
      Reconciled::Inserted => {
        info!(alert_id = alert.id(), reporter = %alert.reporter().full_name, "new SOS alert")
      }
      Reconciled::Updated => debug!(alert_id = alert.id(), "alert updated"),
      Reconciled::Unchanged => debug!(alert_id = alert.id(), "duplicate alert delivery ignored"),
    }
    if change != Reconciled::Unchanged
      && let Some(stored) = self.alerts.get(alert.id())
    {
      self.mailbox.record_alert(stored).await?;
    }
    Ok(Observed::Alert { id: alert.id().to_owned(), change })
  }

  fn observe_location(&mut self, location: Location) -> Observed {
    debug!(lat = location.latitude, lng = location.longitude, "reporter location");
    self.last_location = Some(location);
    Observed::Location(location)
  }
}
