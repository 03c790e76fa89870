//! Booking time-to-live policy and the clock it is evaluated against.
//!
//! A booking's deadline is `created_at + ttl`. It is expired strictly after
//! the deadline: a confirmation arriving at exactly the deadline is still in
//! time, and a sweep at exactly the deadline leaves the booking alone. Every
//! component that asks "is this booking expired?" goes through
//! [`is_expired`], so confirmation and sweeping can never disagree.

use std::{
  sync::{Mutex, PoisonError},
  time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};

/// Confirmation window applied when an event is created without one.
pub const DEFAULT_BOOKING_TTL: Duration = Duration::from_secs(20 * 60);

/// A zero TTL means "use the system default".
pub fn effective_ttl(ttl: Duration) -> Duration {
  if ttl.is_zero() { DEFAULT_BOOKING_TTL } else { ttl }
}

/// The last instant at which a booking created at `created_at` may still be
/// confirmed.
pub fn deadline(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
  let delta = TimeDelta::from_std(effective_ttl(ttl)).unwrap_or(TimeDelta::MAX);
  created_at
    .checked_add_signed(delta)
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn is_expired(
  created_at: DateTime<Utc>,
  ttl: Duration,
  now: DateTime<Utc>,
) -> bool {
  now > deadline(created_at, ttl)
}

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of "now" for the lifecycle engine.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to. Used by tests and simulations that
/// need to step across TTL boundaries deterministically.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self { Self { now: Mutex::new(start) } }

  pub fn set(&self, to: DateTime<Utc>) {
    *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
  }

  pub fn advance(&self, by: TimeDelta) {
    let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
    *now += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
  }

  #[test]
  fn zero_ttl_falls_back_to_default() {
    assert_eq!(effective_ttl(Duration::ZERO), DEFAULT_BOOKING_TTL);
    assert_eq!(effective_ttl(Duration::from_secs(5)), Duration::from_secs(5));
  }

  #[test]
  fn deadline_itself_is_not_expired() {
    let ttl = Duration::from_secs(600);
    let at_deadline = t0() + TimeDelta::seconds(600);
    assert!(!is_expired(t0(), ttl, at_deadline));
    assert!(is_expired(t0(), ttl, at_deadline + TimeDelta::microseconds(1)));
  }

  #[test]
  fn zero_ttl_uses_default_window() {
    let within = t0() + TimeDelta::minutes(19);
    let after = t0() + TimeDelta::minutes(21);
    assert!(!is_expired(t0(), Duration::ZERO, within));
    assert!(is_expired(t0(), Duration::ZERO, after));
  }

  #[test]
  fn huge_ttl_saturates_instead_of_overflowing() {
    let ttl = Duration::from_secs(u64::MAX);
    assert!(!is_expired(t0(), ttl, t0() + TimeDelta::days(365 * 1000)));
  }

  #[test]
  fn manual_clock_advances() {
    let clock = ManualClock::new(t0());
    clock.advance(TimeDelta::minutes(11));
    assert_eq!(clock.now(), t0() + TimeDelta::minutes(11));
    clock.set(t0());
    assert_eq!(clock.now(), t0());
  }
}
