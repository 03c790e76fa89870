//! The booking state machine.
//!
//! ```text
//! [start] --book, paid event--> Pending
//! [start] --book, free event--> Confirmed
//! Pending --confirm within ttl--> Confirmed
//! Pending --ttl elapsed, sweep--> Cancelled
//! ```
//!
//! Confirmed and Cancelled are terminal. Every transition is one store
//! primitive; the engine never reads, decides, and writes in separate steps.

use std::sync::Arc;

use booker_core::{
  Error, Result,
  booking::{Booking, BookingStatus, NewBooking},
  event::{Event, EventDetails, NewEvent},
  notify::{Notice, Notifier},
  store::{CapacityStore, Catalog},
  ttl::{Clock, SystemClock},
  user::{NewUser, User},
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  dispatch::{detached, spawn_notice},
  retry::RetryPolicy,
};

/// Coordinates the catalog, the capacity store, and the notifier.
pub struct BookingEngine<S, N> {
  store:    Arc<S>,
  notifier: Arc<N>,
  clock:    Arc<dyn Clock>,
  retry:    RetryPolicy,
}

impl<S, N> Clone for BookingEngine<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      notifier: Arc::clone(&self.notifier),
      clock:    Arc::clone(&self.clock),
      retry:    self.retry.clone(),
    }
  }
}

impl<S, N> BookingEngine<S, N>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  pub fn new(store: S, notifier: N) -> Self {
    Self {
      store:    Arc::new(store),
      notifier: Arc::new(notifier),
      clock:    Arc::new(SystemClock),
      retry:    RetryPolicy::default(),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn clock(&self) -> &dyn Clock { self.clock.as_ref() }

  pub fn store(&self) -> &S { &self.store }

  // ─── Lifecycle ─────────────────────────────────────────────────────────────
  //
  // Each transition runs on a detached task that commits and then dispatches
  // the notice. Dropping the caller's future cannot separate the two.

  /// Reserve a seat for `user_id` at `event_id`.
  ///
  /// Paid events start `Pending` and must be confirmed within the event's
  /// ttl; free events start `Confirmed`.
  pub async fn book(&self, event_id: Uuid, user_id: Uuid) -> Result<Booking> {
    let engine = self.clone();
    detached(async move { engine.commit_booking(event_id, user_id).await }).await
  }

  /// Confirm the user's pending booking for a paid event.
  pub async fn confirm(&self, event_id: Uuid, user_id: Uuid) -> Result<Booking> {
    let engine = self.clone();
    detached(async move { engine.commit_confirmation(event_id, user_id).await }).await
  }

  /// Cancel every pending booking whose ttl has elapsed as of `now` and
  /// notify the affected users.
  ///
  /// Returns the cancelled bookings. Notices go out from one detached task;
  /// a booking whose user or event cannot be resolved is logged and skipped.
  pub async fn cancel_expired(&self, now: DateTime<Utc>) -> Result<Vec<Booking>> {
    let engine = self.clone();
    detached(async move { engine.commit_sweep(now).await }).await
  }

  async fn commit_booking(&self, event_id: Uuid, user_id: Uuid) -> Result<Booking> {
    let event = self.load_event(event_id).await?;
    let user = self.load_user(user_id).await?;

    let input = NewBooking {
      event_id,
      user_id,
      status: BookingStatus::initial(event.requires_payment),
    };
    let store = &*self.store;
    let now = self.clock.now();
    let booking = self
      .retry
      .run("try_create_booking", move || store.try_create_booking(input, now))
      .await?;

    info!(
      booking_id = %booking.booking_id,
      %event_id,
      %user_id,
      status = %booking.status,
      "booking created"
    );

    let notice = match booking.status {
      BookingStatus::Confirmed => Notice::Confirmed,
      _ => Notice::Created,
    };
    spawn_notice(&self.notifier, notice, user, event);
    Ok(booking)
  }

  async fn commit_confirmation(&self, event_id: Uuid, user_id: Uuid) -> Result<Booking> {
    let event = self.load_event(event_id).await?;
    if !event.requires_payment {
      return Err(Error::validation(
        "event does not require payment; bookings are confirmed on creation",
      ));
    }

    let store = &*self.store;
    let ttl = event.effective_ttl();
    let now = self.clock.now();
    let booking = self
      .retry
      .run("confirm_if_eligible", move || {
        store.confirm_if_eligible(event_id, user_id, ttl, now)
      })
      .await?;

    info!(booking_id = %booking.booking_id, %event_id, %user_id, "booking confirmed");

    match self.load_user(user_id).await {
      Ok(user) => spawn_notice(&self.notifier, Notice::Confirmed, user, event),
      Err(error) => warn!(
        booking_id = %booking.booking_id,
        %user_id,
        %error,
        "could not resolve user for confirmation notice"
      ),
    }
    Ok(booking)
  }

  async fn commit_sweep(&self, now: DateTime<Utc>) -> Result<Vec<Booking>> {
    let store = &*self.store;
    let cancelled = self
      .retry
      .run("sweep_expired", move || store.sweep_expired(now))
      .await?;

    if cancelled.is_empty() {
      debug!("no expired bookings");
      return Ok(cancelled);
    }
    info!(count = cancelled.len(), "cancelled expired bookings");

    let store = Arc::clone(&self.store);
    let notifier = Arc::clone(&self.notifier);
    let batch = cancelled.clone();
    tokio::spawn(async move {
      for booking in batch {
        match resolve(&*store, &booking).await {
          Ok((user, event)) => {
            notifier.notify(Notice::Cancelled, &user, &event).await;
          }
          Err(error) => warn!(
            booking_id = %booking.booking_id,
            event_id = %booking.event_id,
            user_id = %booking.user_id,
            %error,
            "skipping cancellation notice"
          ),
        }
      }
    });

    Ok(cancelled)
  }

  // ─── Queries ───────────────────────────────────────────────────────────────

  /// The event, its remaining capacity, and its active bookings.
  pub async fn event_details(&self, event_id: Uuid) -> Result<EventDetails> {
    let event = self.load_event(event_id).await?;
    let store = &*self.store;
    let available_spots = self
      .retry
      .run("available_spots", move || store.available_spots(event_id))
      .await?
      .ok_or(Error::EventNotFound(event_id))?;
    let bookings = self
      .retry
      .run("active_bookings_for_event", move || {
        store.active_bookings_for_event(event_id)
      })
      .await?;
    Ok(EventDetails { event, available_spots, bookings })
  }

  /// Every booking the user has made, newest first.
  pub async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
    self.load_user(user_id).await?;
    let store = &*self.store;
    self
      .retry
      .run("bookings_for_user", move || store.bookings_for_user(user_id))
      .await
  }

  pub async fn list_events(&self) -> Result<Vec<Event>> {
    let store = &*self.store;
    self.retry.run("list_events", move || store.list_events()).await
  }

  pub async fn list_users(&self) -> Result<Vec<User>> {
    let store = &*self.store;
    self.retry.run("list_users", move || store.list_users()).await
  }

  // ─── Catalog writes ────────────────────────────────────────────────────────

  /// Validate and persist an event. Catalog writes are not retried.
  pub async fn create_event(&self, input: NewEvent) -> Result<Event> {
    let event = self
      .store
      .create_event(input, self.clock.now())
      .await
      .map_err(Into::<Error>::into)?;
    info!(event_id = %event.event_id, title = %event.title, "event created");
    Ok(event)
  }

  pub async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = self
      .store
      .create_user(input, self.clock.now())
      .await
      .map_err(Into::<Error>::into)?;
    info!(user_id = %user.user_id, username = %user.username, "user created");
    Ok(user)
  }

  // ─── Helpers ───────────────────────────────────────────────────────────────

  async fn load_event(&self, event_id: Uuid) -> Result<Event> {
    let store = &*self.store;
    self
      .retry
      .run("get_event", move || store.get_event(event_id))
      .await?
      .ok_or(Error::EventNotFound(event_id))
  }

  async fn load_user(&self, user_id: Uuid) -> Result<User> {
    let store = &*self.store;
    self
      .retry
      .run("get_user", move || store.get_user(user_id))
      .await?
      .ok_or(Error::UserNotFound(user_id))
  }
}

async fn resolve<S: Catalog>(store: &S, booking: &Booking) -> Result<(User, Event)> {
  let user = store
    .get_user(booking.user_id)
    .await
    .map_err(Into::<Error>::into)?
    .ok_or(Error::UserNotFound(booking.user_id))?;
  let event = store
    .get_event(booking.event_id)
    .await
    .map_err(Into::<Error>::into)?
    .ok_or(Error::EventNotFound(booking.event_id))?;
  Ok((user, event))
}
