//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header::RETRY_AFTER},
  response::{IntoResponse, Response},
};
use roster_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Domain(#[from] CoreError),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("admin password rejected")]
  Unauthorized,

  #[error("admin actions are disabled: no admin password is configured")]
  AdminDisabled,
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::Domain(e) => domain_status(e),
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::AdminDisabled => StatusCode::FORBIDDEN,
    }
  }

  /// Stable machine-readable code, mirrored in the response body.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Domain(e) => e.kind(),
      Self::NotFound(_) => "not_found",
      Self::Unauthorized => "unauthorized",
      Self::AdminDisabled => "admin_disabled",
    }
  }
}

// Malformed bodies and query strings are input errors, reported in the same
// JSON shape as every other failure rather than axum's plain-text 4xx.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::Domain(CoreError::InvalidInput(rejection.body_text()))
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self::Domain(CoreError::InvalidInput(rejection.body_text()))
  }
}

fn domain_status(e: &CoreError) -> StatusCode {
  match e {
    CoreError::GateClosed(_) => StatusCode::FORBIDDEN,
    CoreError::AlreadyCheckedIn(_)
    | CoreError::AlreadyCheckedOut(_)
    | CoreError::QueueNumberTaken { .. }
    | CoreError::StubAlreadyClaimed(_)
    | CoreError::StubAlreadyClaimedElsewhere(_) => StatusCode::CONFLICT,
    CoreError::InvalidInput(_)
    | CoreError::MissingNumberGiven
    | CoreError::MissingClaimant => StatusCode::BAD_REQUEST,
    CoreError::SessionNotFound(_) | CoreError::MemberNotFound(_) => StatusCode::NOT_FOUND,
    CoreError::Busy => StatusCode::SERVICE_UNAVAILABLE,
    CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(kind = self.kind(), "{self}");
    }

    let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
    let mut response = (status, body).into_response();
    if matches!(self, Self::Domain(CoreError::Busy)) {
      response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from_static("1"));
    }
    response
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use roster_core::{gate::Phase, session::QueueNumber};

  #[test]
  fn conflicts_map_to_409() {
    let n = QueueNumber::new(3).unwrap();
    for e in [
      CoreError::QueueNumberTaken { number: n, holder: None },
      CoreError::StubAlreadyClaimed(n),
      CoreError::StubAlreadyClaimedElsewhere(n),
      CoreError::AlreadyCheckedOut(uuid::Uuid::nil()),
    ] {
      assert_eq!(ApiError::from(e).status(), StatusCode::CONFLICT);
    }
  }

  #[test]
  fn gate_and_validation_statuses() {
    assert_eq!(
      ApiError::from(CoreError::GateClosed(Phase::CheckOut)).status(),
      StatusCode::FORBIDDEN
    );
    assert_eq!(
      ApiError::from(CoreError::MissingClaimant).status(),
      StatusCode::BAD_REQUEST
    );
  }

  #[test]
  fn busy_carries_retry_after() {
    let resp = ApiError::from(CoreError::Busy).into_response();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.headers().get(RETRY_AFTER).unwrap(), "1");
  }
}
