//! Events: the scarce resource users compete for.
//!
//! An event is owned by the catalog. The booking core only reads it: its
//! seat count and confirmation policy never change after creation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, booking::Booking, ttl};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:         Uuid,
  pub title:            String,
  pub description:      String,
  pub event_date:       DateTime<Utc>,
  /// Always positive.
  pub total_spots:      u32,
  /// Whether bookings start `Pending` and must be confirmed within the TTL.
  pub requires_payment: bool,
  #[serde(rename = "booking_ttl_secs", with = "duration_secs")]
  pub booking_ttl:      Duration,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl Event {
  /// The confirmation window actually enforced for this event's bookings.
  pub fn effective_ttl(&self) -> Duration { ttl::effective_ttl(self.booking_ttl) }
}

/// An event together with its live capacity figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetails {
  pub event:           Event,
  pub available_spots: u32,
  /// Active (pending or confirmed) bookings only.
  pub bookings:        Vec<Booking>,
}

// ─── NewEvent ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::Catalog::create_event`].
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub title:            String,
  pub description:      String,
  pub event_date:       DateTime<Utc>,
  pub total_spots:      u32,
  /// Defaults to `true` when unset.
  pub requires_payment: Option<bool>,
  /// Zero selects [`ttl::DEFAULT_BOOKING_TTL`].
  pub booking_ttl:      Duration,
}

impl NewEvent {
  pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::validation("title is required"));
    }
    if self.total_spots == 0 {
      return Err(Error::validation("total_spots must be positive"));
    }
    if self.event_date <= now {
      return Err(Error::validation("event_date must be in the future"));
    }
    Ok(())
  }

  /// Validate and turn the input into a fully-populated [`Event`] with a
  /// fresh identifier, resolving defaults.
  pub fn build(self, now: DateTime<Utc>) -> Result<Event> {
    self.validate(now)?;
    Ok(Event {
      event_id:         Uuid::new_v4(),
      title:            self.title,
      description:      self.description,
      event_date:       self.event_date,
      total_spots:      self.total_spots,
      requires_payment: self.requires_payment.unwrap_or(true),
      booking_ttl:      ttl::effective_ttl(self.booking_ttl),
      created_at:       now,
      updated_at:       now,
    })
  }
}

/// Serialise a [`Duration`] as whole seconds.
mod duration_secs {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    Ok(Duration::from_secs(u64::deserialize(d)?))
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeDelta;

  use super::*;

  fn input(now: DateTime<Utc>) -> NewEvent {
    NewEvent {
      title:            "Rust meetup".into(),
      description:      String::new(),
      event_date:       now + TimeDelta::days(7),
      total_spots:      10,
      requires_payment: None,
      booking_ttl:      Duration::ZERO,
    }
  }

  #[test]
  fn build_resolves_defaults() {
    let now = Utc::now();
    let event = input(now).build(now).unwrap();
    assert!(event.requires_payment);
    assert_eq!(event.booking_ttl, ttl::DEFAULT_BOOKING_TTL);
    assert_eq!(event.created_at, now);
  }

  #[test]
  fn rejects_zero_spots() {
    let now = Utc::now();
    let mut bad = input(now);
    bad.total_spots = 0;
    assert!(matches!(bad.validate(now), Err(Error::Validation(_))));
  }

  #[test]
  fn rejects_blank_title_and_past_dates() {
    let now = Utc::now();
    let mut blank = input(now);
    blank.title = "   ".into();
    assert!(matches!(blank.validate(now), Err(Error::Validation(_))));

    let mut past = input(now);
    past.event_date = now - TimeDelta::hours(1);
    assert!(matches!(past.validate(now), Err(Error::Validation(_))));
  }

  #[test]
  fn ttl_serialises_as_seconds() {
    let now = Utc::now();
    let mut new = input(now);
    new.booking_ttl = Duration::from_secs(90);
    let event = new.build(now).unwrap();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["booking_ttl_secs"], 90);

    let back: Event = serde_json::from_value(json).unwrap();
    assert_eq!(back.booking_ttl, Duration::from_secs(90));
  }
}
