//! Error types for `booker-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("event not found: {0}")]
  EventNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("no active booking for user {user_id} on event {event_id}")]
  BookingNotFound { event_id: Uuid, user_id: Uuid },

  #[error("no available spots for event {0}")]
  NoAvailableSpots(Uuid),

  #[error("user {user_id} already has a booking for event {event_id}")]
  AlreadyBooked { event_id: Uuid, user_id: Uuid },

  #[error("booking {0} is not in pending status")]
  BookingNotPending(Uuid),

  #[error("booking {0} has expired")]
  BookingExpired(Uuid),

  #[error("username {0:?} is already taken")]
  UsernameTaken(String),

  #[error("validation error: {0}")]
  Validation(String),

  /// The backing store failed for a reason unrelated to the request itself.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A stored value could not be decoded. Repeating the read returns the same
  /// bytes.
  #[error("corrupt stored data: {0}")]
  Corrupt(String),
}

/// Coarse classification used by callers to pick a response or a retry
/// strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Conflict,
  Validation,
  Infrastructure,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::EventNotFound(_)
      | Self::UserNotFound(_)
      | Self::BookingNotFound { .. } => ErrorKind::NotFound,
      Self::NoAvailableSpots(_)
      | Self::AlreadyBooked { .. }
      | Self::BookingNotPending(_)
      | Self::BookingExpired(_)
      | Self::UsernameTaken(_) => ErrorKind::Conflict,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Store(_) | Self::Corrupt(_) => ErrorKind::Infrastructure,
    }
  }

  /// Only an unavailable store may succeed on a second attempt. Domain
  /// outcomes and undecodable rows are final.
  pub fn is_transient(&self) -> bool { matches!(self, Self::Store(_)) }

  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_store_errors_are_transient() {
    let id = Uuid::new_v4();
    assert!(!Error::NoAvailableSpots(id).is_transient());
    assert!(!Error::BookingExpired(id).is_transient());
    assert!(!Error::validation("nope").is_transient());

    let io = std::io::Error::other("disk on fire");
    assert!(Error::Store(Box::new(io)).is_transient());

    let corrupt = Error::Corrupt("bad timestamp".into());
    assert_eq!(corrupt.kind(), ErrorKind::Infrastructure);
    assert!(!corrupt.is_transient());
  }

  #[test]
  fn capacity_conflicts_share_a_kind() {
    let id = Uuid::new_v4();
    for err in [
      Error::NoAvailableSpots(id),
      Error::AlreadyBooked { event_id: id, user_id: id },
      Error::BookingNotPending(id),
      Error::BookingExpired(id),
    ] {
      assert_eq!(err.kind(), ErrorKind::Conflict);
    }
    assert_eq!(
      Error::BookingNotFound { event_id: id, user_id: id }.kind(),
      ErrorKind::NotFound
    );
  }
}
