//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users` | In creation order |
//! | `POST` | `/users` | Body: `{"username":"...","telegram_chat_id":123}`; returns 201 |
//! | `GET`  | `/users/{id}/bookings` | Every booking, newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use booker_core::{
  booking::Booking,
  notify::Notifier,
  store::{CapacityStore, Catalog},
  user::{NewUser, User},
};
use booker_engine::BookingEngine;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `GET /users`
pub async fn list<S, N>(
  State(engine): State<Arc<BookingEngine<S, N>>>,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(engine.list_users().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username:         String,
  pub telegram_chat_id: Option<i64>,
}

/// `POST /users`
pub async fn create<S, N>(
  State(engine): State<Arc<BookingEngine<S, N>>>,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  let user = engine
    .create_user(NewUser {
      username:         body.username,
      telegram_chat_id: body.telegram_chat_id,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/{id}/bookings`
pub async fn bookings<S, N>(
  State(engine): State<Arc<BookingEngine<S, N>>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Booking>>, ApiError>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(engine.bookings_for_user(id).await?))
}
