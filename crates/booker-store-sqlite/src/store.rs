//! [`SqliteStore`], the SQLite implementation of [`Catalog`] and
//! [`CapacityStore`].

use std::{path::Path, time::Duration};

use booker_core::{
  booking::{Booking, BookingStatus, NewBooking},
  event::{Event, NewEvent},
  store::{CapacityStore, Catalog},
  ttl,
  user::{NewUser, User},
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, ffi};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    BOOKING_COLUMNS, EVENT_COLUMNS, RawBooking, RawEvent, RawUser, USER_COLUMNS,
    active_status_filter, decode_dt, decode_uuid, encode_dt, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An event booker store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Transaction outcomes ────────────────────────────────────────────────────

/// What happened inside the booking-creation transaction.
enum CreateOutcome {
  Created,
  EventNotFound,
  UserNotFound,
  NoAvailableSpots,
  AlreadyBooked,
}

/// What happened inside the confirmation transaction. Booking ids are the
/// raw column values.
enum ConfirmOutcome {
  Confirmed(RawBooking),
  NotFound,
  NotPending(String),
  Expired(String),
}

fn is_constraint(e: &rusqlite::Error, extended_code: i32) -> bool {
  matches!(e, rusqlite::Error::SqliteFailure(f, _) if f.extended_code == extended_code)
}

/// Smuggle a decoding failure out of a `call` closure.
fn call_error(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Catalog impl ────────────────────────────────────────────────────────────

impl Catalog for SqliteStore {
  type Error = Error;

  async fn create_user(&self, input: NewUser, now: DateTime<Utc>) -> Result<User> {
    let user = input.build(now)?;

    let id_str   = encode_uuid(user.user_id);
    let username = user.username.clone();
    let chat_id  = user.telegram_chat_id;
    let at_str   = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (user_id, username, telegram_chat_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, username, chat_id, at_str],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_constraint(&e, ffi::SQLITE_CONSTRAINT_UNIQUE) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(booker_core::Error::UsernameTaken(user.username).into());
    }
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, username"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn create_event(&self, input: NewEvent, now: DateTime<Utc>) -> Result<Event> {
    let event = input.build(now)?;

    let id_str      = encode_uuid(event.event_id);
    let title       = event.title.clone();
    let description = event.description.clone();
    let date_str    = encode_dt(event.event_date);
    let total_spots = i64::from(event.total_spots);
    let payment     = event.requires_payment;
    let ttl_secs    = i64::try_from(event.booking_ttl.as_secs())
      .map_err(|_| booker_core::Error::validation("booking_ttl is too large"))?;
    let at_str      = encode_dt(event.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (
             event_id, title, description, event_date, total_spots,
             requires_payment, booking_ttl_secs, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str,
            title,
            description,
            date_str,
            total_spots,
            payment,
            ttl_secs,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
            rusqlite::params![id_str],
            RawEvent::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn list_events(&self) -> Result<Vec<Event>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date DESC"
        ))?;
        let rows = stmt
          .query_map([], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}

// ─── CapacityStore impl ──────────────────────────────────────────────────────

impl CapacityStore for SqliteStore {
  type Error = Error;

  async fn try_create_booking(
    &self,
    input: NewBooking,
    now:   DateTime<Utc>,
  ) -> Result<Booking> {
    let booking = Booking {
      booking_id: Uuid::new_v4(),
      event_id:   input.event_id,
      user_id:    input.user_id,
      status:     input.status,
      created_at: now,
      updated_at: now,
    };

    let id_str     = encode_uuid(booking.booking_id);
    let event_str  = encode_uuid(booking.event_id);
    let user_str   = encode_uuid(booking.user_id);
    let status_str = encode_status(booking.status);
    let at_str     = encode_dt(now);

    let outcome = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock before the seat count is read, so no
        // other creator can slip in between the count and the insert.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let total: Option<i64> = tx
          .query_row(
            "SELECT total_spots FROM events WHERE event_id = ?1",
            rusqlite::params![event_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(total) = total else {
          return Ok(CreateOutcome::EventNotFound);
        };

        let active: i64 = tx.query_row(
          &format!(
            "SELECT COUNT(*) FROM bookings WHERE event_id = ?1 AND {}",
            active_status_filter("status")
          ),
          rusqlite::params![event_str],
          |r| r.get(0),
        )?;
        if active >= total {
          return Ok(CreateOutcome::NoAvailableSpots);
        }

        let inserted = tx.execute(
          &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?5)"
          ),
          rusqlite::params![id_str, event_str, user_str, status_str, at_str],
        );
        match inserted {
          Ok(_) => {
            tx.commit()?;
            Ok(CreateOutcome::Created)
          }
          Err(e) if is_constraint(&e, ffi::SQLITE_CONSTRAINT_UNIQUE) => {
            Ok(CreateOutcome::AlreadyBooked)
          }
          Err(e) if is_constraint(&e, ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
            Ok(CreateOutcome::UserNotFound)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    let (event_id, user_id) = (input.event_id, input.user_id);
    match outcome {
      CreateOutcome::Created => Ok(booking),
      CreateOutcome::EventNotFound => Err(booker_core::Error::EventNotFound(event_id).into()),
      CreateOutcome::UserNotFound => Err(booker_core::Error::UserNotFound(user_id).into()),
      CreateOutcome::NoAvailableSpots => {
        Err(booker_core::Error::NoAvailableSpots(event_id).into())
      }
      CreateOutcome::AlreadyBooked => {
        Err(booker_core::Error::AlreadyBooked { event_id, user_id }.into())
      }
    }
  }

  async fn confirm_if_eligible(
    &self,
    event_id: Uuid,
    user_id:  Uuid,
    ttl:      Duration,
    now:      DateTime<Utc>,
  ) -> Result<Booking> {
    let event_str = encode_uuid(event_id);
    let user_str  = encode_uuid(user_id);
    let now_str   = encode_dt(now);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<RawBooking> = tx
          .query_row(
            &format!(
              "SELECT {BOOKING_COLUMNS} FROM bookings
               WHERE event_id = ?1 AND user_id = ?2 AND {}
               ORDER BY created_at DESC
               LIMIT 1",
              active_status_filter("status")
            ),
            rusqlite::params![event_str, user_str],
            RawBooking::from_row,
          )
          .optional()?;

        let Some(mut raw) = current else {
          return Ok(ConfirmOutcome::NotFound);
        };
        if raw.status != encode_status(BookingStatus::Pending) {
          return Ok(ConfirmOutcome::NotPending(raw.booking_id));
        }
        let created_at = decode_dt(&raw.created_at).map_err(call_error)?;
        if ttl::is_expired(created_at, ttl, now) {
          return Ok(ConfirmOutcome::Expired(raw.booking_id));
        }

        // The status predicate makes this a no-op if anything else has
        // already moved the booking out of `pending`.
        let changed = tx.execute(
          "UPDATE bookings SET status = 'confirmed', updated_at = ?2
           WHERE booking_id = ?1 AND status = 'pending'",
          rusqlite::params![raw.booking_id, now_str],
        )?;
        if changed != 1 {
          return Ok(ConfirmOutcome::NotPending(raw.booking_id));
        }
        tx.commit()?;

        raw.status = encode_status(BookingStatus::Confirmed).to_owned();
        raw.updated_at = now_str;
        Ok(ConfirmOutcome::Confirmed(raw))
      })
      .await?;

    match outcome {
      ConfirmOutcome::Confirmed(raw) => raw.into_booking(),
      ConfirmOutcome::NotFound => {
        Err(booker_core::Error::BookingNotFound { event_id, user_id }.into())
      }
      ConfirmOutcome::NotPending(id) => {
        Err(booker_core::Error::BookingNotPending(decode_uuid(&id)?).into())
      }
      ConfirmOutcome::Expired(id) => {
        Err(booker_core::Error::BookingExpired(decode_uuid(&id)?).into())
      }
    }
  }

  async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<Booking>> {
    let now_str = encode_dt(now);

    let raws: Vec<RawBooking> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidates = {
          let mut stmt = tx.prepare(
            "SELECT b.booking_id, b.event_id, b.user_id, b.status,
                    b.created_at, b.updated_at, e.booking_ttl_secs
             FROM bookings b
             JOIN events e ON e.event_id = b.event_id
             WHERE b.status = 'pending' AND b.created_at < ?1
             ORDER BY b.created_at",
          )?;
          stmt
            .query_map(rusqlite::params![now_str], |row| {
              Ok((RawBooking::from_row(row)?, row.get::<_, i64>(6)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut cancelled = Vec::new();
        for (mut raw, ttl_secs) in candidates {
          let created_at = decode_dt(&raw.created_at).map_err(call_error)?;
          let ttl = Duration::from_secs(u64::try_from(ttl_secs).unwrap_or(0));
          if !ttl::is_expired(created_at, ttl, now) {
            continue;
          }

          let changed = tx.execute(
            "UPDATE bookings SET status = 'cancelled', updated_at = ?2
             WHERE booking_id = ?1 AND status = 'pending'",
            rusqlite::params![raw.booking_id, now_str],
          )?;
          if changed == 1 {
            raw.status = encode_status(BookingStatus::Cancelled).to_owned();
            raw.updated_at = now_str.clone();
            cancelled.push(raw);
          }
        }

        tx.commit()?;
        Ok(cancelled)
      })
      .await?;

    raws.into_iter().map(RawBooking::into_booking).collect()
  }

  async fn active_bookings_for_event(&self, event_id: Uuid) -> Result<Vec<Booking>> {
    let event_str = encode_uuid(event_id);

    let raws: Vec<RawBooking> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BOOKING_COLUMNS} FROM bookings
           WHERE event_id = ?1 AND {}
           ORDER BY created_at",
          active_status_filter("status")
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![event_str], RawBooking::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBooking::into_booking).collect()
  }

  async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawBooking> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BOOKING_COLUMNS} FROM bookings
           WHERE user_id = ?1
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawBooking::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBooking::into_booking).collect()
  }

  async fn available_spots(&self, event_id: Uuid) -> Result<Option<u32>> {
    let event_str = encode_uuid(event_id);

    let remaining: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT e.total_spots - (
                 SELECT COUNT(*) FROM bookings b
                 WHERE b.event_id = e.event_id AND {}
               )
               FROM events e WHERE e.event_id = ?1",
              active_status_filter("b.status")
            ),
            rusqlite::params![event_str],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    remaining
      .map(|n| u32::try_from(n.max(0)).map_err(|_| Error::OutOfRange(n.to_string())))
      .transpose()
  }
}
