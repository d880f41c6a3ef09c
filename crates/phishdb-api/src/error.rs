//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("failed to encode record: {0}")]
  Encode(#[from] serde_json::Error),
}

impl ApiError {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    tracing::error!(error = %err, "failed to fetch records");
    ApiError::Store(Box::new(err))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(_) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "failed to fetch records".to_owned(),
      ),
      ApiError::Encode(_) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "failed to encode record".to_owned(),
      ),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
