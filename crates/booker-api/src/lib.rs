//! JSON REST API for the event booker.
//!
//! Exposes an axum [`Router`] backed by a [`BookingEngine`]. Every error,
//! including extractor rejections, panics, and timeouts, is a JSON
//! `{"error": ..}` body. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", booker_api::api_router(engine.clone(), Duration::from_secs(10)))
//! ```

pub mod error;
pub mod events;
pub mod extract;
pub mod users;

use std::{any::Any, sync::Arc, time::Duration};

use axum::{
  BoxError, Json, Router,
  error_handling::HandleErrorLayer,
  http::StatusCode,
  response::Response,
  routing::{get, post},
};
use booker_core::{
  notify::Notifier,
  store::{CapacityStore, Catalog},
};
use booker_engine::BookingEngine;
use serde_json::{Value, json};
use tower::{ServiceBuilder, timeout::TimeoutLayer};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub use error::ApiError;

use crate::error::{error_response, internal_error};

/// Build a fully-materialised API router for `engine`.
///
/// Requests running longer than `request_timeout` are answered with 408.
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(engine: Arc<BookingEngine<S, N>>, request_timeout: Duration) -> Router<()>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  let routes = Router::new()
    .route("/health", get(health))
    // Events
    .route("/events", get(events::list::<S, N>).post(events::create::<S, N>))
    .route("/events/{id}", get(events::get_one::<S, N>))
    .route("/events/{id}/book", post(events::book::<S, N>))
    .route("/events/{id}/confirm", post(events::confirm::<S, N>))
    // Users
    .route("/users", get(users::list::<S, N>).post(users::create::<S, N>))
    .route("/users/{id}/bookings", get(users::bookings::<S, N>))
    .with_state(engine);
  with_middleware(routes, request_timeout)
}

/// Tracing, panic recovery, and the request timeout, outermost first.
fn with_middleware(routes: Router<()>, request_timeout: Duration) -> Router<()> {
  routes.layer(
    ServiceBuilder::new()
      .layer(TraceLayer::new_for_http())
      .layer(CatchPanicLayer::custom(panic_response))
      .layer(HandleErrorLayer::new(middleware_error))
      .layer(TimeoutLayer::new(request_timeout)),
  )
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
  let detail = panic
    .downcast_ref::<String>()
    .map(String::as_str)
    .or_else(|| panic.downcast_ref::<&str>().copied())
    .unwrap_or("non-string panic payload");
  tracing::error!(panic = detail, "handler panicked");
  internal_error()
}

async fn middleware_error(err: BoxError) -> Response {
  if err.is::<tower::timeout::error::Elapsed>() {
    return error_response(StatusCode::REQUEST_TIMEOUT, "request timed out");
  }
  tracing::error!(error = %err, "middleware failed");
  internal_error()
}
