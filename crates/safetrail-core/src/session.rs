//! The reporter side: one logged-in tourist raising an SOS.
//!
//! A [`Session`] owns the reporter's identity, their current location, the
//! SOS state machine and an optional periodic location-sharing task. The
//! state machine has two states and no user-initiated cancel:
//!
//! ```text
//!   Idle ──trigger_sos──▶ Active ──reset──▶ Idle
//!                         │    ▲
//!                         └────┘ trigger_sos (re-sends an undelivered alert,
//!                                otherwise a no-op)
//! ```
//!
//! The session becomes `Active` as soon as its alert is in the persisted
//! `sosAlerts` list, so a broadcast that fails is retried with the same alert
//! rather than a second one.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use tokio::{
  sync::watch,
  task::JoinHandle,
  time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
  Result,
  alert::{Alert, Reporter},
  builder::build_alert,
  channel::{Broadcaster, Delivery, DualChannel},
  facility::{FacilityCatalog, FacilityKind},
  geo::Location,
  store::KeyValueStore,
};

/// How often a sharing session re-broadcasts the reporter's location.
pub const LOCATION_SHARE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SosState {
  Idle,
  Active,
}

pub struct Session<B, K> {
  reporter:    Reporter,
  catalog:     FacilityCatalog,
  channel:     DualChannel<B, K>,
  location:    watch::Sender<Location>,
  active:      Option<Alert>,
  /// The active alert is persisted but its broadcast has not gone out.
  undelivered: bool,
  sharing:     Option<LocationSharing>,
}

impl<B: Broadcaster, K: KeyValueStore> Session<B, K> {
  pub fn new(
    reporter: Reporter,
    location: Location,
    catalog: FacilityCatalog,
    channel: DualChannel<B, K>,
  ) -> Self {
    let (location, _) = watch::channel(location);
    Self {
      reporter,
      catalog,
      channel,
      location,
      active: None,
      undelivered: false,
      sharing: None,
    }
  }

  pub fn reporter(&self) -> &Reporter { &self.reporter }

  pub fn state(&self) -> SosState {
    if self.active.is_some() { SosState::Active } else { SosState::Idle }
  }

  /// The alert raised in this session, if any.
  pub fn active_alert(&self) -> Option<&Alert> { self.active.as_ref() }

  pub fn location(&self) -> Location { *self.location.borrow() }

  /// Record a new position from the geolocation source. A running sharing
  /// task picks it up on its next tick.
  pub fn update_location(&self, location: Location) { self.location.send_replace(location); }

  // ── SOS ───────────────────────────────────────────────────────────────

  /// Raise an SOS at the current location.
  ///
  /// Builds the alert, appends it to the persisted `sosAlerts` list and
  /// broadcasts it. A failure before the alert is persisted leaves the
  /// session idle. Once persisted the session is active; if the broadcast
  /// then fails, the next call re-sends the same alert. While an SOS is
  /// active and delivered this does nothing and returns `None`.
  pub async fn trigger_sos(&mut self) -> Result<Option<Delivery>> {
    if self.active.is_some() && !self.undelivered {
      debug!("SOS already active");
      return Ok(None);
    }

    let alert = match self.active.clone() {
      Some(alert) => {
        debug!(alert_id = alert.id(), "re-sending undelivered SOS");
        alert
      }
      None => {
        let alert = build_alert(&self.reporter, self.location(), &self.catalog)?;
        self.channel.mailbox().record_alert(&alert).await?;
        self.active = Some(alert.clone());
        self.undelivered = true;
        alert
      }
    };

    let delivery = self.channel.send_alert(&alert).await?;
    self.undelivered = false;
    info!(
      alert_id = alert.id(),
      police = %alert.nearest_police().facility.name,
      hospital = %alert.nearest_hospital().facility.name,
      ?delivery,
      "SOS raised"
    );
    Ok(Some(delivery))
  }

  /// Mark the active alert as forwarded to its nearest facility of `kind`,
  /// persist it and broadcast the update. `None` when no SOS is active.
  pub async fn send_to_facility(&mut self, kind: FacilityKind) -> Result<Option<Delivery>> {
    let Some(alert) = self.active.as_mut() else {
      return Ok(None);
    };
    alert.mark_sent(kind);
    let alert = alert.clone();

    self.channel.mailbox().record_alert(&alert).await?;
    let delivery = self.channel.send_alert(&alert).await?;
    info!(alert_id = alert.id(), facility = %kind, "alert sent to facility");
    Ok(Some(delivery))
  }

  /// Return to `Idle` and stop location sharing, as on logout.
  pub async fn reset(&mut self) {
    self.stop_location_sharing().await;
    self.active = None;
    self.undelivered = false;
  }

  // ── Location sharing ──────────────────────────────────────────────────

  pub fn is_sharing_location(&self) -> bool { self.sharing.is_some() }

  /// Start broadcasting the current location every `period`. Returns
  /// `false` if sharing was already running.
  pub fn start_location_sharing(&mut self, period: Duration) -> bool
  where
    B: Clone + 'static,
    K: Clone + 'static,
  {
    if self.sharing.is_some() {
      return false;
    }
    self.sharing = Some(LocationSharing::spawn(
      self.channel.clone(),
      self.location.subscribe(),
      period,
    ));
    true
  }

  /// Stop location sharing. No broadcast happens after this returns, on any
  /// runtime flavour.
  pub async fn stop_location_sharing(&mut self) -> bool {
    match self.sharing.take() {
      Some(sharing) => {
        sharing.stop().await;
        true
      }
      None => false,
    }
  }
}

// ─── Periodic task ───────────────────────────────────────────────────────────

/// A running location-sharing task.
///
/// [`LocationSharing::stop`] waits for the task to finish. [`cancel`] and
/// drop only signal it: on a multi-threaded runtime a publish already past
/// the flag check may still land after they return.
///
/// [`cancel`]: LocationSharing::cancel
pub struct LocationSharing {
  cancelled: Arc<AtomicBool>,
  handle:    JoinHandle<()>,
}

impl LocationSharing {
  pub fn spawn<B, K>(
    channel: DualChannel<B, K>,
    location: watch::Receiver<Location>,
    period: Duration,
  ) -> Self
  where
    B: Broadcaster + 'static,
    K: KeyValueStore + 'static,
  {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        if flag.load(Ordering::Acquire) {
          break;
        }
        let here = *location.borrow();
        if let Err(e) = channel.send_location(here).await {
          warn!(error = %e, "location share failed");
        }
      }
    });

    Self { cancelled, handle }
  }

  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::Release);
    self.handle.abort();
  }

  /// Cancel and wait until the task has exited.
  pub async fn stop(mut self) {
    self.cancel();
    if let Err(e) = (&mut self.handle).await
      && e.is_panic()
    {
      warn!(error = %e, "location sharing task panicked");
    }
  }
}

impl Drop for LocationSharing {
  fn drop(&mut self) { self.cancel(); }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use tokio::sync::broadcast::error::TryRecvError;

  use super::*;
  use crate::{
    Error,
    channel::{ChannelMessage, LocalChannel, NoPrimaryChannel},
    dashboard::Dashboard,
    mailbox::Mailbox,
    store::MemoryStore,
  };

  fn here() -> Location { Location::new(12.9716, 77.5946).unwrap() }

  fn reporter() -> Reporter { Reporter::new("Asha Rao", "P1234567", "+91-9876543210") }

  fn session<B: Broadcaster>(primary: B, store: &MemoryStore) -> Session<B, MemoryStore> {
    Session::new(
      reporter(),
      here(),
      FacilityCatalog::bengaluru(),
      DualChannel::new(primary, Mailbox::new(store.clone())),
    )
  }

  #[tokio::test]
  async fn trigger_is_idempotent_until_reset() {
    let store = MemoryStore::new();
    let mut session = session(LocalChannel::new(), &store);
    assert_eq!(session.state(), SosState::Idle);

    assert_eq!(session.trigger_sos().await.unwrap(), Some(Delivery::Primary));
    let first = session.active_alert().unwrap().id().to_owned();
    assert_eq!(session.trigger_sos().await.unwrap(), None);
    assert_eq!(session.active_alert().unwrap().id(), first);
    assert_eq!(session.state(), SosState::Active);

    let mailbox = Mailbox::new(store.clone());
    assert_eq!(mailbox.alerts().await.unwrap().len(), 1);

    session.reset().await;
    assert_eq!(session.state(), SosState::Idle);
    session.trigger_sos().await.unwrap();
    assert_ne!(session.active_alert().unwrap().id(), first);
    assert_eq!(mailbox.alerts().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn failed_trigger_stays_idle() {
    let store = MemoryStore::new();
    let mut session = Session::new(
      reporter(),
      here(),
      FacilityCatalog::default(),
      DualChannel::new(LocalChannel::new(), Mailbox::new(store.clone())),
    );
    assert!(matches!(session.trigger_sos().await, Err(Error::EmptyFacilitySet)));
    assert_eq!(session.state(), SosState::Idle);
    assert!(Mailbox::new(store).alerts().await.unwrap().is_empty());
  }

  /// A [`MemoryStore`] whose `n`th write (1-based) fails.
  #[derive(Clone)]
  struct FailingWrite {
    inner:   MemoryStore,
    fail_at: usize,
    writes:  Arc<AtomicUsize>,
  }

  #[derive(Debug, thiserror::Error)]
  #[error("disk full")]
  struct DiskFull;

  impl KeyValueStore for FailingWrite {
    type Error = DiskFull;

    async fn get(&self, key: &str) -> Result<Option<String>, DiskFull> {
      Ok(self.inner.get(key).await.unwrap())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), DiskFull> {
      if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
        return Err(DiskFull);
      }
      self.inner.set(key, value).await.unwrap();
      Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DiskFull> {
      self.inner.remove(key).await.unwrap();
      Ok(())
    }
  }

  #[tokio::test]
  async fn failed_broadcast_is_retried_with_the_same_alert() {
    let store = FailingWrite { inner: MemoryStore::new(), fail_at: 2, writes: Arc::default() };
    let mut session = Session::new(
      reporter(),
      here(),
      FacilityCatalog::bengaluru(),
      DualChannel::new(NoPrimaryChannel, Mailbox::new(store.clone())),
    );

    assert!(matches!(session.trigger_sos().await, Err(Error::Store(_))));
    assert_eq!(session.state(), SosState::Active);
    let id = session.active_alert().unwrap().id().to_owned();

    assert_eq!(session.trigger_sos().await.unwrap(), Some(Delivery::Fallback));
    assert_eq!(session.trigger_sos().await.unwrap(), None);

    let mailbox = Mailbox::new(store.inner.clone());
    let persisted = mailbox.alerts().await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].id(), id);
    assert_eq!(mailbox.latest_alert().await.unwrap().unwrap().data.id(), id);
  }

  #[tokio::test]
  async fn failed_persist_stays_idle() {
    let store = FailingWrite { inner: MemoryStore::new(), fail_at: 1, writes: Arc::default() };
    let mut session = Session::new(
      reporter(),
      here(),
      FacilityCatalog::bengaluru(),
      DualChannel::new(NoPrimaryChannel, Mailbox::new(store.clone())),
    );

    assert!(matches!(session.trigger_sos().await, Err(Error::Store(_))));
    assert_eq!(session.state(), SosState::Idle);

    session.trigger_sos().await.unwrap();
    assert_eq!(Mailbox::new(store.inner).alerts().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn dispatch_updates_reach_a_fallback_only_observer() {
    let store = MemoryStore::new();
    let mut session = session(NoPrimaryChannel, &store);
    let mut observer = Dashboard::load(Mailbox::new(store.clone())).await.unwrap();

    assert_eq!(session.send_to_facility(FacilityKind::Police).await.unwrap(), None);

    session.trigger_sos().await.unwrap();
    observer.poll_mailbox().await.unwrap();
    let id = session.active_alert().unwrap().id().to_owned();
    assert!(!observer.alerts().get(&id).unwrap().sent_to_police());

    assert_eq!(
      session.send_to_facility(FacilityKind::Police).await.unwrap(),
      Some(Delivery::Fallback)
    );
    observer.poll_mailbox().await.unwrap();
    assert_eq!(observer.alerts().len(), 1);
    assert!(observer.alerts().get(&id).unwrap().sent_to_police());
    assert!(!observer.alerts().get(&id).unwrap().sent_to_hospital());

    let persisted = Mailbox::new(store).alerts().await.unwrap();
    assert!(persisted[0].sent_to_police());
  }

  #[tokio::test]
  async fn location_sharing_ticks_until_stopped() {
    let store = MemoryStore::new();
    let primary = LocalChannel::new();
    let mut rx = primary.subscribe();
    let mut session = session(primary, &store);

    assert!(session.start_location_sharing(Duration::from_millis(10)));
    assert!(!session.start_location_sharing(Duration::from_millis(10)));
    let moved = Location::new(12.98, 77.60).unwrap();
    session.update_location(moved);

    match rx.recv().await.unwrap() {
      ChannelMessage::LocationUpdate(location) => assert_eq!(location, moved),
      other => panic!("unexpected {other:?}"),
    }
    let envelope = Mailbox::new(store).latest_location().await.unwrap().unwrap();
    assert_eq!(envelope.data, moved);

    assert!(session.stop_location_sharing().await);
    assert!(!session.is_sharing_location());
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn stopping_on_a_threaded_runtime_silences_the_task() {
    let store = MemoryStore::new();
    let primary = LocalChannel::new();
    let mut rx = primary.subscribe();
    let mut session = session(primary, &store);

    session.start_location_sharing(Duration::from_millis(1));
    rx.recv().await.unwrap();
    assert!(session.stop_location_sharing().await);

    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
  }

  #[tokio::test]
  async fn cancelling_before_the_first_tick_broadcasts_nothing() {
    let store = MemoryStore::new();
    let primary = LocalChannel::new();
    let mut rx = primary.subscribe();
    let mut session = session(primary, &store);

    session.start_location_sharing(Duration::from_millis(20));
    session.reset().await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert!(Mailbox::new(store).latest_location().await.unwrap().is_none());
  }
}
