//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use lattice_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] lattice_core::Error),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ApiError::Core(e) => e.kind(),
      ApiError::BadRequest(_) => ErrorKind::Validation,
    }
  }
}

/// Malformed or mistyped JSON bodies surface as validation errors.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let status = match kind {
      ErrorKind::Validation => StatusCode::BAD_REQUEST,
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Conflict => StatusCode::CONFLICT,
      ErrorKind::Execution => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": self.to_string(), "kind": kind }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn kinds_map_onto_status_codes() {
    let cases = [
      (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
      (
        lattice_core::Error::not_found(lattice_core::EntityKind::Topic, Uuid::nil()).into(),
        StatusCode::NOT_FOUND,
      ),
      (
        lattice_core::Error::Locked { ids: vec![Uuid::nil()] }.into(),
        StatusCode::CONFLICT,
      ),
      (
        lattice_core::Error::execution("merge_topics", "stranded questions").into(),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(err.into_response().status(), status);
    }
  }
}
