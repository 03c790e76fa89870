//! SQL schema for the booker SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id          TEXT PRIMARY KEY,
    username         TEXT NOT NULL UNIQUE,
    telegram_chat_id INTEGER,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    event_id         TEXT PRIMARY KEY,
    title            TEXT NOT NULL,
    description      TEXT NOT NULL DEFAULT '',
    event_date       TEXT NOT NULL,
    total_spots      INTEGER NOT NULL CHECK (total_spots > 0),
    requires_payment INTEGER NOT NULL,
    booking_ttl_secs INTEGER NOT NULL CHECK (booking_ttl_secs >= 0),
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

-- Bookings are never deleted; only `status` and `updated_at` change.
CREATE TABLE IF NOT EXISTS bookings (
    booking_id TEXT PRIMARY KEY,
    event_id   TEXT NOT NULL REFERENCES events(event_id),
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    status     TEXT NOT NULL CHECK (status IN ('pending', 'confirmed', 'cancelled')),
    created_at TEXT NOT NULL,   -- fixed-width RFC 3339 UTC; sorts lexically
    updated_at TEXT NOT NULL
);

-- At most one active booking per (event, user).
CREATE UNIQUE INDEX IF NOT EXISTS bookings_active_uidx
    ON bookings(event_id, user_id)
    WHERE status IN ('pending', 'confirmed');

CREATE INDEX IF NOT EXISTS bookings_event_status_idx ON bookings(event_id, status);
CREATE INDEX IF NOT EXISTS bookings_user_idx         ON bookings(user_id);
CREATE INDEX IF NOT EXISTS bookings_status_idx       ON bookings(status, created_at);

PRAGMA user_version = 1;
";
