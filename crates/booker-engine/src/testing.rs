//! Test doubles shared by the engine tests.

use std::{
  collections::HashSet,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use booker_core::{
  Error, Result,
  booking::{Booking, NewBooking},
  event::{Event, NewEvent},
  notify::{Notice, Notifier},
  store::{CapacityStore, Catalog},
  ttl::ManualClock,
  user::{NewUser, User},
};
use booker_store_sqlite::SqliteStore;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{BookingEngine, RetryPolicy};

// ─── Notifier ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
  pub notice:   Notice,
  pub user_id:  Uuid,
  pub event_id: Uuid,
}

pub struct RecordingNotifier(mpsc::UnboundedSender<Sent>);

impl Notifier for RecordingNotifier {
  async fn notify(&self, notice: Notice, user: &User, event: &Event) {
    let _ = self.0.send(Sent {
      notice,
      user_id: user.user_id,
      event_id: event.event_id,
    });
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Delegates to SQLite, optionally failing or slowing calls, or hiding users
/// from lookups.
pub struct FlakyStore {
  inner:           SqliteStore,
  failing_creates: AtomicUsize,
  failing_sweeps:  AtomicUsize,
  hidden_users:    Mutex<HashSet<Uuid>>,
  user_delay:      Mutex<Duration>,
  sweep_delay:     Mutex<Duration>,
}

impl FlakyStore {
  pub fn fail_next_creates(&self, n: usize) {
    self.failing_creates.store(n, Ordering::SeqCst);
  }

  pub fn fail_next_sweeps(&self, n: usize) {
    self.failing_sweeps.store(n, Ordering::SeqCst);
  }

  pub fn pending_sweep_failures(&self) -> usize { self.failing_sweeps.load(Ordering::SeqCst) }

  pub fn hide_user(&self, id: Uuid) {
    self.hidden_users.lock().unwrap().insert(id);
  }

  pub fn slow_user_lookups(&self, by: Duration) { *self.user_delay.lock().unwrap() = by; }

  /// Delay applied before a sweep reaches the database.
  pub fn slow_sweeps(&self, by: Duration) { *self.sweep_delay.lock().unwrap() = by; }
}

fn unavailable() -> Error {
  Error::Store(Box::new(std::io::Error::other("database is locked")))
}

/// Consume one injected failure, if any are left.
fn take_failure(counter: &AtomicUsize) -> bool {
  counter
    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
    .is_ok()
}

impl Catalog for FlakyStore {
  type Error = Error;

  async fn create_user(&self, input: NewUser, now: DateTime<Utc>) -> Result<User> {
    self.inner.create_user(input, now).await.map_err(Into::into)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let delay = *self.user_delay.lock().unwrap();
    tokio::time::sleep(delay).await;
    if self.hidden_users.lock().unwrap().contains(&id) {
      return Ok(None);
    }
    self.inner.get_user(id).await.map_err(Into::into)
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    self.inner.list_users().await.map_err(Into::into)
  }

  async fn create_event(&self, input: NewEvent, now: DateTime<Utc>) -> Result<Event> {
    self.inner.create_event(input, now).await.map_err(Into::into)
  }

  async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
    self.inner.get_event(id).await.map_err(Into::into)
  }

  async fn list_events(&self) -> Result<Vec<Event>> {
    self.inner.list_events().await.map_err(Into::into)
  }
}

impl CapacityStore for FlakyStore {
  type Error = Error;

  async fn try_create_booking(
    &self,
    input: NewBooking,
    now: DateTime<Utc>,
  ) -> Result<Booking> {
    if take_failure(&self.failing_creates) {
      return Err(unavailable());
    }
    self.inner.try_create_booking(input, now).await.map_err(Into::into)
  }

  async fn confirm_if_eligible(
    &self,
    event_id: Uuid,
    user_id: Uuid,
    ttl: Duration,
    now: DateTime<Utc>,
  ) -> Result<Booking> {
    self
      .inner
      .confirm_if_eligible(event_id, user_id, ttl, now)
      .await
      .map_err(Into::into)
  }

  async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<Booking>> {
    let delay = *self.sweep_delay.lock().unwrap();
    tokio::time::sleep(delay).await;
    if take_failure(&self.failing_sweeps) {
      return Err(unavailable());
    }
    self.inner.sweep_expired(now).await.map_err(Into::into)
  }

  async fn active_bookings_for_event(&self, event_id: Uuid) -> Result<Vec<Booking>> {
    self.inner.active_bookings_for_event(event_id).await.map_err(Into::into)
  }

  async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
    self.inner.bookings_for_user(user_id).await.map_err(Into::into)
  }

  async fn available_spots(&self, event_id: Uuid) -> Result<Option<u32>> {
    self.inner.available_spots(event_id).await.map_err(Into::into)
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

pub type TestEngine = BookingEngine<FlakyStore, RecordingNotifier>;

pub struct Harness {
  pub engine:  Arc<TestEngine>,
  pub clock:   Arc<ManualClock>,
  pub notices: mpsc::UnboundedReceiver<Sent>,
}

pub fn start() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() }

pub async fn harness() -> Harness {
  let store = FlakyStore {
    inner:           SqliteStore::open_in_memory().await.unwrap(),
    failing_creates: AtomicUsize::new(0),
    failing_sweeps:  AtomicUsize::new(0),
    hidden_users:    Mutex::new(HashSet::new()),
    user_delay:      Mutex::new(Duration::ZERO),
    sweep_delay:     Mutex::new(Duration::ZERO),
  };
  let (tx, notices) = mpsc::unbounded_channel();
  let clock = Arc::new(ManualClock::new(start()));
  let engine = BookingEngine::new(store, RecordingNotifier(tx))
    .with_clock(clock.clone())
    .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));
  Harness { engine: Arc::new(engine), clock, notices }
}

impl Harness {
  pub async fn user(&self, name: &str) -> User {
    self
      .engine
      .create_user(NewUser { username: name.into(), telegram_chat_id: Some(42) })
      .await
      .unwrap()
  }

  pub async fn event(&self, spots: u32, requires_payment: bool, ttl_mins: u64) -> Event {
    self
      .engine
      .create_event(NewEvent {
        title:            "Launch party".into(),
        description:      String::new(),
        event_date:       start() + TimeDelta::days(30),
        total_spots:      spots,
        requires_payment: Some(requires_payment),
        booking_ttl:      Duration::from_secs(ttl_mins * 60),
      })
      .await
      .unwrap()
  }

  /// Next notice, failing the test if none arrives within a second.
  pub async fn next_notice(&mut self) -> Sent {
    tokio::time::timeout(Duration::from_secs(1), self.notices.recv())
      .await
      .expect("no notice dispatched")
      .expect("notifier dropped")
  }

  /// Asserts nothing else is dispatched within a short grace period.
  pub async fn assert_quiet(&mut self) {
    let next = tokio::time::timeout(Duration::from_millis(100), self.notices.recv()).await;
    assert!(next.is_err(), "unexpected notice: {next:?}");
  }

  pub fn store(&self) -> &FlakyStore { self.engine.store() }
}
