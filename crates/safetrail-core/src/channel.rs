//! Dual-channel delivery: a best-effort primary publish/subscribe channel
//! with the single-slot mailbox as fallback.
//!
//! The sender decides which path to take from its *own* capabilities only.
//! When the primary channel exists the mailbox is not written, so receivers
//! that listen on both never see an alert twice; when it does not exist the
//! mailbox is always written, whatever the receivers support.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
  Error, Result,
  alert::Alert,
  geo::Location,
  mailbox::Mailbox,
  store::KeyValueStore,
};

/// Default capacity of the in-process primary channel. A subscriber that
/// falls further behind than this skips ahead to the newest message.
pub const PRIMARY_CAPACITY: usize = 256;

/// A message on the primary channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelMessage {
  SosAlert(Alert),
  LocationUpdate(Location),
}

// ─── Primary channel ─────────────────────────────────────────────────────────

/// The primary, ephemeral delivery channel.
///
/// `publish` reaches every observer subscribed at the time of the call and
/// nobody else. It must return [`Error::ChannelUnavailable`] when the channel
/// does not exist at all; a send that reaches zero subscribers is still `Ok`.
pub trait Broadcaster: Send + Sync {
  fn publish(&self, message: &ChannelMessage) -> Result<()>;
}

impl<B: Broadcaster + ?Sized> Broadcaster for Arc<B> {
  fn publish(&self, message: &ChannelMessage) -> Result<()> { (**self).publish(message) }
}

/// In-process primary channel over [`tokio::sync::broadcast`].
///
/// Cloning is cheap; clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct LocalChannel {
  tx: broadcast::Sender<ChannelMessage>,
}

impl LocalChannel {
  pub fn new() -> Self { Self::with_capacity(PRIMARY_CAPACITY) }

  pub fn with_capacity(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  /// Start receiving. Only messages published after this call arrive.
  pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> { self.tx.subscribe() }
}

impl Default for LocalChannel {
  fn default() -> Self { Self::new() }
}

impl Broadcaster for LocalChannel {
  fn publish(&self, message: &ChannelMessage) -> Result<()> {
    // `send` only fails when nobody is listening, which is normal.
    let receivers = self.tx.send(message.clone()).unwrap_or(0);
    debug!(receivers, "published on primary channel");
    Ok(())
  }
}

/// A runtime without a primary channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrimaryChannel;

impl Broadcaster for NoPrimaryChannel {
  fn publish(&self, _message: &ChannelMessage) -> Result<()> { Err(Error::ChannelUnavailable) }
}

// ─── Dual channel ────────────────────────────────────────────────────────────

/// Which path a send took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
  Primary,
  Fallback,
}

/// Sender side of dual-channel delivery.
#[derive(Debug, Clone)]
pub struct DualChannel<B, K> {
  primary: B,
  mailbox: Mailbox<K>,
}

impl<B: Broadcaster, K: KeyValueStore> DualChannel<B, K> {
  pub fn new(primary: B, mailbox: Mailbox<K>) -> Self { Self { primary, mailbox } }

  pub fn mailbox(&self) -> &Mailbox<K> { &self.mailbox }

  /// Deliver a new or updated alert: primary channel if it exists, otherwise
  /// the alert mailbox.
  pub async fn send_alert(&self, alert: &Alert) -> Result<Delivery> {
    match self.primary.publish(&ChannelMessage::SosAlert(alert.clone())) {
      Ok(()) => Ok(Delivery::Primary),
      Err(Error::ChannelUnavailable) => {
        debug!(alert_id = alert.id(), "primary channel unavailable, posting to mailbox");
        self.mailbox.post_alert(alert).await?;
        Ok(Delivery::Fallback)
      }
      Err(e) => Err(e),
    }
  }

  /// Deliver a location update. The location mailbox is refreshed on every
  /// send; a location is latest-value-wins, so a duplicate is harmless.
  pub async fn send_location(&self, location: Location) -> Result<Delivery> {
    let delivery = match self.primary.publish(&ChannelMessage::LocationUpdate(location)) {
      Ok(()) => Delivery::Primary,
      Err(Error::ChannelUnavailable) => Delivery::Fallback,
      Err(e) => return Err(e),
    };
    self.mailbox.post_location(location).await?;
    Ok(delivery)
  }
}
