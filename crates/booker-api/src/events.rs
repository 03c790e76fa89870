//! Handlers for `/events` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events` | Latest `event_date` first |
//! | `POST` | `/events` | Body: [`CreateBody`]; returns 201 + event |
//! | `GET`  | `/events/{id}` | Event, free seats, and active bookings |
//! | `POST` | `/events/{id}/book` | Body: `{"user_id":"..."}`; returns 201 + booking |
//! | `POST` | `/events/{id}/confirm` | Body: `{"user_id":"..."}` |

use std::{sync::Arc, time::Duration};

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use booker_core::{
  booking::Booking,
  event::{Event, EventDetails, NewEvent},
  notify::Notifier,
  store::{CapacityStore, Catalog},
};
use booker_engine::BookingEngine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /events`
pub async fn list<S, N>(
  State(engine): State<Arc<BookingEngine<S, N>>>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(engine.list_events().await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:            String,
  #[serde(default)]
  pub description:      String,
  pub event_date:       DateTime<Utc>,
  pub total_spots:      u32,
  /// Defaults to `true`.
  pub requires_payment: Option<bool>,
  /// Confirmation window for paid bookings. `0` or absent means 20 minutes.
  #[serde(default)]
  pub booking_ttl_secs: u64,
}

impl From<CreateBody> for NewEvent {
  fn from(body: CreateBody) -> Self {
    Self {
      title:            body.title,
      description:      body.description,
      event_date:       body.event_date,
      total_spots:      body.total_spots,
      requires_payment: body.requires_payment,
      booking_ttl:      Duration::from_secs(body.booking_ttl_secs),
    }
  }
}

/// `POST /events`
pub async fn create<S, N>(
  State(engine): State<Arc<BookingEngine<S, N>>>,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  let event = engine.create_event(body.into()).await?;
  Ok((StatusCode::CREATED, Json(event)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /events/{id}`
pub async fn get_one<S, N>(
  State(engine): State<Arc<BookingEngine<S, N>>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<EventDetails>, ApiError>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(engine.event_details(id).await?))
}

// ─── Book / confirm ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserBody {
  pub user_id: Uuid,
}

/// `POST /events/{id}/book`
pub async fn book<S, N>(
  State(engine): State<Arc<BookingEngine<S, N>>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<UserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  let booking = engine.book(id, body.user_id).await?;
  Ok((StatusCode::CREATED, Json(booking)))
}

/// `POST /events/{id}/confirm`
pub async fn confirm<S, N>(
  State(engine): State<Arc<BookingEngine<S, N>>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<UserBody>,
) -> Result<Json<Booking>, ApiError>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(engine.confirm(id, body.user_id).await?))
}
