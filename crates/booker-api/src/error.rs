//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use booker_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Domain(#[from] booker_core::Error),

  /// The request body was missing, not JSON, or the wrong shape.
  #[error(transparent)]
  Json(#[from] JsonRejection),

  /// A path segment did not parse (e.g. a malformed UUID).
  #[error(transparent)]
  Path(#[from] PathRejection),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Domain(err) => {
        let status = match err.kind() {
          ErrorKind::NotFound => StatusCode::NOT_FOUND,
          ErrorKind::Conflict => StatusCode::CONFLICT,
          ErrorKind::Validation => StatusCode::BAD_REQUEST,
          ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
          tracing::error!(error = %err, "request failed");
          return internal_error();
        }
        error_response(status, err.to_string())
      }
      ApiError::Json(rejection) => error_response(rejection.status(), rejection.body_text()),
      ApiError::Path(rejection) => error_response(rejection.status(), rejection.body_text()),
    }
  }
}

/// `{"error": message}` with `status`.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
  (status, Json(json!({ "error": message.into() }))).into_response()
}

/// A 500 that reveals nothing about the cause.
pub(crate) fn internal_error() -> Response {
  error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}
