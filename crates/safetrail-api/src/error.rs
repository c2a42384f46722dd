//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure renders as `{"success": false, "message": …}`.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] safetrail_core::Error),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl ApiError {
  fn status(&self) -> StatusCode {
    use safetrail_core::Error as Core;
    match self {
      Self::Core(Core::AlertNotFound(_)) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) | Self::Core(Core::InvalidCoordinate { .. }) => StatusCode::BAD_REQUEST,
      Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      Self::Core(safetrail_core::Error::AlertNotFound(_)) => "Alert not found".to_owned(),
      other => other.to_string(),
    };
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "success": false, "message": message }))).into_response()
  }
}
