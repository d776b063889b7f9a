//! Handler for `GET /members/search`.

use axum::{Json, extract::State};
use roster_core::member::MemberMatch;
use serde::Deserialize;

use crate::{AppState, Backend, error::ApiError, extract::ApiQuery};

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  /// Name fragment, or a queue number.
  #[serde(default)]
  pub q: String,
}

/// `GET /members/search?q=...`
pub async fn search<S: Backend>(
  State(state): State<AppState<S>>,
  ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<MemberMatch>>, ApiError> {
  Ok(Json(state.attendance.search_members(&params.q).await?))
}
