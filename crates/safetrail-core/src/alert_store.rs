//! The observer-side alert list.
//!
//! An [`AlertStore`] is an insertion-ordered sequence of alerts keyed by id.
//! Every observer owns one; the relay keeps one as a cache for observers that
//! connect late. Alerts may arrive more than once (primary channel, mailbox,
//! relay snapshot), so every entry point is idempotent by id.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
  Error, Result,
  alert::{Alert, AlertPatch, AlertStatus},
  mailbox::Envelope,
};

/// What a write did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
  Inserted,
  Updated,
  Unchanged,
}

/// Aggregate counts for a dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
  pub total:     usize,
  pub pending:   usize,
  pub resolved:  usize,
  /// Distinct reporter names across all alerts.
  pub reporters: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertStore {
  alerts: Vec<Alert>,
}

impl AlertStore {
  pub fn new() -> Self { Self::default() }

  /// Build a store from a persisted list. Later duplicates of an id are
  /// dropped.
  pub fn from_alerts(alerts: impl IntoIterator<Item = Alert>) -> Self {
    let mut store = Self::new();
    for alert in alerts {
      store.insert(alert);
    }
    store
  }

  pub fn len(&self) -> usize { self.alerts.len() }

  pub fn is_empty(&self) -> bool { self.alerts.is_empty() }

  pub fn get(&self, id: &str) -> Option<&Alert> { self.alerts.iter().find(|a| a.id() == id) }

  pub fn contains(&self, id: &str) -> bool { self.get(id).is_some() }

  pub fn iter(&self) -> impl Iterator<Item = &Alert> { self.alerts.iter() }

  pub fn as_slice(&self) -> &[Alert] { &self.alerts }

  /// Append `alert` unless its id is already present. Returns whether it was
  /// inserted; an existing record is left untouched.
  pub fn insert(&mut self, alert: Alert) -> bool {
    if self.contains(alert.id()) {
      return false;
    }
    self.alerts.push(alert);
    true
  }

  /// Merge `patch` into the alert with `id`.
  pub fn update_status(&mut self, id: &str, patch: &AlertPatch) -> Result<&Alert> {
    let alert = self.position(id).map(|i| &mut self.alerts[i]);
    let alert = alert.ok_or_else(|| Error::AlertNotFound(id.to_owned()))?;
    alert.apply(patch);
    Ok(alert)
  }

  /// Remove and return the alert with `id`.
  pub fn delete(&mut self, id: &str) -> Result<Alert> {
    let index = self
      .position(id)
      .ok_or_else(|| Error::AlertNotFound(id.to_owned()))?;
    Ok(self.alerts.remove(index))
  }

  /// Insert a new alert, or bring the mutable fields of a known one up to
  /// date with `alert`.
  pub fn upsert(&mut self, alert: &Alert) -> Reconciled {
    let Some(i) = self.position(alert.id()) else {
      self.alerts.push(alert.clone());
      return Reconciled::Inserted;
    };
    if self.alerts[i].apply(&AlertPatch::from(alert)) {
      Reconciled::Updated
    } else {
      Reconciled::Unchanged
    }
  }

  /// Catch up from the single-slot mailbox: a new id is inserted, a known id
  /// is updated.
  pub fn reconcile_from_fallback(&mut self, envelope: &Envelope<Alert>) -> Reconciled {
    self.upsert(&envelope.data)
  }

  pub fn stats(&self) -> AlertStats {
    let count = |status: AlertStatus| self.alerts.iter().filter(|a| *a.status() == status).count();
    let reporters: HashSet<&str> = self
      .alerts
      .iter()
      .map(|a| a.reporter().full_name.as_str())
      .collect();

    AlertStats {
      total:     self.alerts.len(),
      pending:   count(AlertStatus::Pending),
      resolved:  count(AlertStatus::Resolved),
      reporters: reporters.len(),
    }
  }

  fn position(&self, id: &str) -> Option<usize> { self.alerts.iter().position(|a| a.id() == id) }
}

impl From<AlertStore> for Vec<Alert> {
  fn from(store: AlertStore) -> Self { store.alerts }
}
