//! Error type for `booker-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain outcome (capacity conflict, missing record, bad input).
  #[error("core error: {0}")]
  Core(#[from] booker_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown booking status: {0:?}")]
  UnknownStatus(String),

  #[error("column value out of range: {0}")]
  OutOfRange(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for booker_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      // decode failures raised inside a `call` closure
      Error::Database(tokio_rusqlite::Error::Other(boxed)) => match boxed.downcast::<Error>() {
        Ok(inner) => (*inner).into(),
        Err(other) => booker_core::Error::Store(Box::new(tokio_rusqlite::Error::Other(other))),
      },
      Error::Database(db) => booker_core::Error::Store(Box::new(Error::Database(db))),
      decode @ (Error::Uuid(_)
      | Error::DateParse(_)
      | Error::UnknownStatus(_)
      | Error::OutOfRange(_)) => booker_core::Error::Corrupt(decode.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decode_failures_are_not_transient() {
    let err: booker_core::Error = Error::UnknownStatus("held".into()).into();
    assert!(matches!(err, booker_core::Error::Corrupt(_)));
    assert!(!err.is_transient());

    let smuggled = Error::Database(tokio_rusqlite::Error::Other(Box::new(
      Error::DateParse("yesterday".into()),
    )));
    let err: booker_core::Error = smuggled.into();
    assert!(matches!(err, booker_core::Error::Corrupt(_)));
  }

  #[test]
  fn connection_failures_are_transient() {
    let err: booker_core::Error = Error::Database(tokio_rusqlite::Error::ConnectionClosed).into();
    assert!(err.is_transient());
  }
}
