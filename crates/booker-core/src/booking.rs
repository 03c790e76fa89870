//! Bookings and their lifecycle states.
//!
//! A booking is never deleted. It is created in either `Pending` or
//! `Confirmed` and may move at most once more, from `Pending` to one of the
//! two terminal states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
  Pending,
  Confirmed,
  Cancelled,
}

impl BookingStatus {
  /// Statuses that hold a seat.
  pub const ACTIVE: [Self; 2] = [Self::Pending, Self::Confirmed];

  /// Paid events start unconfirmed; free events are confirmed on the spot.
  pub fn initial(requires_payment: bool) -> Self {
    if requires_payment { Self::Pending } else { Self::Confirmed }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Confirmed => "confirmed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl std::fmt::Display for BookingStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A user's claim on one seat of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
  pub booking_id: Uuid,
  pub event_id:   Uuid,
  pub user_id:    Uuid,
  pub status:     BookingStatus,
  pub created_at: DateTime<Utc>,
  /// Moves forward on every status transition.
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::CapacityStore::try_create_booking`].
/// The identifier and timestamps are assigned by the store.
#[derive(Debug, Clone, Copy)]
pub struct NewBooking {
  pub event_id: Uuid,
  pub user_id:  Uuid,
  pub status:   BookingStatus,
}
