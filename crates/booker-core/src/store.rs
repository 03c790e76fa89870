//! The `Catalog` and `CapacityStore` traits.
//!
//! Both are implemented by storage backends (e.g. `booker-store-sqlite`).
//! The lifecycle engine depends on these abstractions, not on any concrete
//! backend.
//!
//! Backend errors must convert into [`crate::Error`]. Domain outcomes
//! (`NoAvailableSpots`, `BookingExpired`, ...) convert to their matching
//! variant; everything else becomes [`crate::Error::Store`], which callers
//! treat as transient.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  booking::{Booking, NewBooking},
  event::{Event, NewEvent},
  user::{NewUser, User},
};

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Read/write access to users and events. The booking core only reads from
/// it; creation exists for the outer API.
pub trait Catalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  /// Persist a new user. Fails with `UsernameTaken` if the name is in use.
  fn create_user(
    &self,
    input: NewUser,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by UUID. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Validate and persist a new event.
  fn create_event(
    &self,
    input: NewEvent,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Retrieve an event by UUID. Returns `None` if not found.
  fn get_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// All events, latest `event_date` first.
  fn list_events(
    &self,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;
}

// ─── CapacityStore ───────────────────────────────────────────────────────────

/// Atomic primitives over booking state.
///
/// Each write method is a single indivisible unit with respect to every other
/// caller: implementations must never expose a window between the check and
/// the write.
pub trait CapacityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  /// Insert a booking if the event still has a free seat.
  ///
  /// Serialises against concurrent creators for the same event, counts the
  /// active bookings, and inserts only if `active < total_spots`. Fails with
  /// `NoAvailableSpots` (no write performed), `AlreadyBooked` if the user
  /// already holds an active booking for the event, or `EventNotFound`.
  fn try_create_booking(
    &self,
    input: NewBooking,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  /// Move the user's pending booking to `Confirmed` if it has not expired
  /// under `ttl` as of `now`, and return the updated record.
  ///
  /// When nothing is confirmed the cause is reported in this order:
  /// `BookingNotFound` (no active booking), `BookingNotPending` (already
  /// confirmed), `BookingExpired` (pending but past its deadline).
  fn confirm_if_eligible(
    &self,
    event_id: Uuid,
    user_id: Uuid,
    ttl: Duration,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  /// Cancel every pending booking whose event TTL has elapsed as of `now`
  /// and return the cancelled records. A booking is returned by at most one
  /// sweep.
  fn sweep_expired(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Booking>, Self::Error>> + Send + '_;

  /// Pending and confirmed bookings for an event.
  fn active_bookings_for_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Booking>, Self::Error>> + Send + '_;

  /// Every booking the user ever made, newest first.
  fn bookings_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Booking>, Self::Error>> + Send + '_;

  /// `total_spots - active bookings`, or `None` if the event does not exist.
  fn available_spots(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<u32>, Self::Error>> + Send + '_;
}
