//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed nanosecond width
//! and a `Z` suffix, so lexical order matches chronological order. UUIDs are
//! stored as hyphenated lowercase strings.

use std::time::Duration;

use booker_core::{
  booking::{Booking, BookingStatus},
  event::Event,
  user::User,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── BookingStatus ────────────────────────────────────────────────────────────

pub fn encode_status(s: BookingStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<BookingStatus> {
  match s {
    "pending" => Ok(BookingStatus::Pending),
    "confirmed" => Ok(BookingStatus::Confirmed),
    "cancelled" => Ok(BookingStatus::Cancelled),
    other => Err(Error::UnknownStatus(other.to_owned())),
  }
}

/// `<column> IN ('pending', 'confirmed')`: the statuses that hold a seat.
pub fn active_status_filter(column: &str) -> String {
  let statuses: Vec<String> = BookingStatus::ACTIVE
    .iter()
    .map(|s| format!("'{}'", encode_status(*s)))
    .collect();
  format!("{column} IN ({})", statuses.join(", "))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawBooking::from_row`].
pub const BOOKING_COLUMNS: &str =
  "booking_id, event_id, user_id, status, created_at, updated_at";

/// Raw strings read directly from a `bookings` row.
#[derive(Debug)]
pub struct RawBooking {
  pub booking_id: String,
  pub event_id:   String,
  pub user_id:    String,
  pub status:     String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawBooking {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      booking_id: row.get(0)?,
      event_id:   row.get(1)?,
      user_id:    row.get(2)?,
      status:     row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_booking(self) -> Result<Booking> {
    Ok(Booking {
      booking_id: decode_uuid(&self.booking_id)?,
      event_id:   decode_uuid(&self.event_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      status:     decode_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "event_id, title, description, event_date, \
  total_spots, requires_payment, booking_ttl_secs, created_at, updated_at";

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:         String,
  pub title:            String,
  pub description:      String,
  pub event_date:       String,
  pub total_spots:      i64,
  pub requires_payment: bool,
  pub booking_ttl_secs: i64,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:         row.get(0)?,
      title:            row.get(1)?,
      description:      row.get(2)?,
      event_date:       row.get(3)?,
      total_spots:      row.get(4)?,
      requires_payment: row.get(5)?,
      booking_ttl_secs: row.get(6)?,
      created_at:       row.get(7)?,
      updated_at:       row.get(8)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    let total_spots = u32::try_from(self.total_spots)
      .map_err(|_| Error::OutOfRange(format!("total_spots = {}", self.total_spots)))?;
    let ttl_secs = u64::try_from(self.booking_ttl_secs).map_err(|_| {
      Error::OutOfRange(format!("booking_ttl_secs = {}", self.booking_ttl_secs))
    })?;

    Ok(Event {
      event_id: decode_uuid(&self.event_id)?,
      title: self.title,
      description: self.description,
      event_date: decode_dt(&self.event_date)?,
      total_spots,
      requires_payment: self.requires_payment,
      booking_ttl: Duration::from_secs(ttl_secs),
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "user_id, username, telegram_chat_id, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:          String,
  pub username:         String,
  pub telegram_chat_id: Option<i64>,
  pub created_at:       String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:          row.get(0)?,
      username:         row.get(1)?,
      telegram_chat_id: row.get(2)?,
      created_at:       row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:          decode_uuid(&self.user_id)?,
      username:         self.username,
      telegram_chat_id: self.telegram_chat_id,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    let b = a + TimeDelta::nanoseconds(1);
    let c = a + TimeDelta::hours(5);
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn active_filter_lists_seat_holding_statuses() {
    assert_eq!(
      active_status_filter("b.status"),
      "b.status IN ('pending', 'confirmed')"
    );
  }

  #[test]
  fn unknown_status_is_rejected() {
    assert!(matches!(decode_status("held"), Err(Error::UnknownStatus(_))));
  }
}
