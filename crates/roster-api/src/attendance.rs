//! Handlers for `/attendance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/attendance/checkin` | 201 + session |
//! | `POST` | `/attendance/:id/checkout` | Body: `{"action":"correct\|mismatch\|proxy\|lost", ...}` |
//! | `GET`  | `/attendance/open/:member_id` | 404 if the member has no open session |
//! | `GET`  | `/attendance/recent` | Optional `?limit=N` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  feed::FeedEvent,
  session::{ActionKind, Actor, CheckoutRequest, QueueNumberInput, Session},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  error::ApiError,
  extract::{ApiJson, ApiQuery},
};

// ─── Check-in ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckinBody {
  pub member_id:    Uuid,
  /// A JSON integer or numeric text.
  pub queue_number: QueueNumberInput,
  pub actor:        Actor,
}

/// `POST /attendance/checkin`
pub async fn check_in<S: Backend>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<CheckinBody>,
) -> Result<impl IntoResponse, ApiError> {
  let session = state
    .attendance
    .check_in(body.member_id, body.queue_number, body.actor)
    .await?;
  Ok((StatusCode::CREATED, Json(session)))
}

// ─── Check-out ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
  pub action:       ActionKind,
  pub number_given: Option<QueueNumberInput>,
  pub claimed_by:   Option<String>,
  pub actor:        Actor,
}

/// `POST /attendance/:id/checkout`
pub async fn check_out<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<CheckoutBody>,
) -> Result<Json<Session>, ApiError> {
  let request = CheckoutRequest {
    action:       body.action,
    number_given: body.number_given,
    claimed_by:   body.claimed_by,
  };
  let session = state.attendance.check_out(id, request, body.actor).await?;
  Ok(Json(session))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /attendance/open/:member_id`
pub async fn open_for<S: Backend>(
  State(state): State<AppState<S>>,
  Path(member_id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
  let session = state
    .attendance
    .get_open_session(member_id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("member {member_id} has no open session")))?;
  Ok(Json(session))
}

#[derive(Debug, Deserialize, Default)]
pub struct RecentParams {
  pub limit: Option<usize>,
}

/// `GET /attendance/recent[?limit=N]`
pub async fn recent<S: Backend>(
  State(state): State<AppState<S>>,
  ApiQuery(params): ApiQuery<RecentParams>,
) -> Result<Json<Vec<FeedEvent>>, ApiError> {
  let events = state.attendance.list_recent_events(params.limit).await?;
  Ok(Json(events))
}
