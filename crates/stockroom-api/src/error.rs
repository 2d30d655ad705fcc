//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use stockroom_core::DomainError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Unknown operation: {0}")]
  UnknownOperation(String),

  /// An argument could not be coerced; no query ran.
  #[error("{0}")]
  BadRequest(String),

  /// The store refused or failed the operation.
  #[error("{source}")]
  Store {
    status: StatusCode,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Wrap a store error, picking the status from its domain error if any.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    let status = err.domain().map_or(StatusCode::INTERNAL_SERVER_ERROR, status_for);
    ApiError::Store { status, source: Box::new(err) }
  }

  pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    ApiError::Store { status: StatusCode::INTERNAL_SERVER_ERROR, source: Box::new(err) }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::UnknownOperation(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Store { status, .. } => *status,
    }
  }
}

fn status_for(err: &stockroom_core::Error) -> StatusCode {
  use stockroom_core::Error;
  match err {
    Error::Validation(_) => StatusCode::BAD_REQUEST,
    Error::VariantNotFound(_) => StatusCode::NOT_FOUND,
    Error::SkuExists | Error::VariantExists | Error::CategoryExists | Error::LastVariant => {
      StatusCode::CONFLICT
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "operation failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn domain_errors_pick_their_status() {
    let cases = [
      (stockroom_core::Error::validation("Name is required."), StatusCode::BAD_REQUEST),
      (stockroom_core::Error::VariantNotFound(3), StatusCode::NOT_FOUND),
      (stockroom_core::Error::SkuExists, StatusCode::CONFLICT),
      (stockroom_core::Error::LastVariant, StatusCode::CONFLICT),
    ];
    for (err, status) in cases {
      let message = err.to_string();
      let api = ApiError::store(err);
      assert_eq!(api.status(), status);
      assert_eq!(api.to_string(), message);
    }
  }

  #[test]
  fn non_domain_errors_are_internal() {
    let err = std::io::Error::other("disk on fire");
    assert_eq!(ApiError::internal(err).status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
