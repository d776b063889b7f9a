//! Handlers for `/event/gate` and `/event/title`.

use axum::{Json, extract::State};
use roster_core::gate::GateConfig;
use serde::{Deserialize, Serialize};

use crate::{AppState, Backend, error::ApiError, extract::ApiJson};

/// `GET /event/gate`
pub async fn show<S: Backend>(
  State(state): State<AppState<S>>,
) -> Result<Json<GateConfig>, ApiError> {
  Ok(Json(state.attendance.current_gate().await?))
}

/// `PUT /event/gate`, body: `{"checkin_enabled":true,"checkout_enabled":false}`
pub async fn update<S: Backend>(
  State(state): State<AppState<S>>,
  ApiJson(config): ApiJson<GateConfig>,
) -> Result<Json<GateConfig>, ApiError> {
  Ok(Json(state.attendance.set_gate(config).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TitleBody {
  pub title: String,
}

/// `GET /event/title`
pub async fn show_title<S: Backend>(
  State(state): State<AppState<S>>,
) -> Result<Json<TitleBody>, ApiError> {
  let title = state.attendance.title().await?;
  Ok(Json(TitleBody { title }))
}

/// `PUT /event/title`, body: `{"title":"General Assembly"}`
pub async fn update_title<S: Backend>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<TitleBody>,
) -> Result<Json<TitleBody>, ApiError> {
  let title = state.attendance.set_title(&body.title).await?;
  Ok(Json(TitleBody { title }))
}
