//! Shared state of the relay.
//!
//! The alert list is a cache for observers that connect late, not durable
//! storage: it lives in memory and is lost on restart. Handlers take the
//! write lock for the whole of a read-modify-write *and* the event publish, so
//! the order observers see events in matches the order of the list.

use std::sync::Arc;

use safetrail_core::{alert_store::AlertStore, event::RelayEvent, facility::FacilityCatalog};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

/// Capacity of the event channel. A connection that falls further behind
/// skips to the newest event.
const EVENT_CAPACITY: usize = 256;

/// An event on its way to connected observers.
#[derive(Debug, Clone)]
pub struct Outbound {
  /// The connection that caused the event, which must not receive it back.
  /// `None` for events raised by REST calls.
  pub origin: Option<Uuid>,
  pub event:  RelayEvent,
}

impl Outbound {
  /// Whether the connection `id` should receive this event.
  pub fn is_for(&self, id: Uuid) -> bool { self.origin != Some(id) }
}

/// Injected into every handler via axum's `State` extractor.
#[derive(Clone)]
pub struct RelayState {
  pub alerts:  Arc<RwLock<AlertStore>>,
  pub events:  broadcast::Sender<Outbound>,
  pub catalog: Arc<FacilityCatalog>,
}

impl RelayState {
  pub fn new(catalog: FacilityCatalog) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self {
      alerts: Arc::new(RwLock::new(AlertStore::new())),
      events,
      catalog: Arc::new(catalog),
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Outbound> { self.events.subscribe() }

  /// Fan `event` out to every connected observer. Having none is fine.
  pub fn publish(&self, origin: Option<Uuid>, event: RelayEvent) {
    let receivers = self.events.send(Outbound { origin, event }).unwrap_or(0);
    debug!(receivers, "relay event published");
  }
}
