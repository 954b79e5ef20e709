//! Error types for syncsched-server

use crate::message::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use syncsched::error::Error as CoreError;
use thiserror::Error;

/// Result type for syncsched-server
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for syncsched-server
#[derive(Error, Debug)]
pub enum Error {
  /// Scheduler core error
  #[error("Scheduler error: {0}")]
  Scheduler(#[from] CoreError),

  /// IO error
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  /// Server error
  #[error("Server error: {0}")]
  Server(String),
}

impl Error {
  /// Create a server error
  pub fn server<S: Into<String>>(msg: S) -> Self {
    Self::Server(msg.into())
  }

  fn status_code(&self) -> StatusCode {
    match self {
      Error::Scheduler(CoreError::ConfigNotFound { .. })
      | Error::Scheduler(CoreError::ResultNotFound { .. }) => StatusCode::NOT_FOUND,
      Error::Scheduler(CoreError::InvalidCron { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::Scheduler(CoreError::Submission(_)) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status_code();
    let body = Json(ApiResponse::<()>::error(
      status.as_u16(),
      self.to_string(),
    ));
    (status, body).into_response()
  }
}
