//! API error taxonomy.
//!
//! Only errors that reach a caller live here. Judgment failures are
//! recovered locally (default to incorrect) and persistence failures are
//! logged and swallowed by the post-completion tasks, so neither has a
//! variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  /// Question/exam generation or another upstream fetch failed. The
  /// caller may retry explicitly.
  #[error("question source unavailable: {0}")]
  QuestionSource(String),

  #[error("student not found: {0}")]
  UnknownStudent(String),

  #[error("session not found: {0}")]
  UnknownSession(String),

  /// Operation not valid in the session's current state (double submit,
  /// answer edit after finalize, advance without a reveal, ...).
  #[error("{0}")]
  InvalidAction(String),

  #[error("{0}")]
  BadRequest(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::QuestionSource(_) => StatusCode::BAD_GATEWAY,
      ApiError::UnknownStudent(_) | ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
      ApiError::InvalidAction(_) => StatusCode::CONFLICT,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
