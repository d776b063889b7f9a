//! Admin re-authentication and the attendance reset.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{AppState, Backend, error::ApiError, extract::ApiJson};

/// Credentials for destructive admin actions.
#[derive(Clone, Default)]
pub struct AdminConfig {
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`. `None`
  /// disables admin actions entirely.
  pub password_hash: Option<String>,
}

impl AdminConfig {
  pub fn new(password_hash: Option<String>) -> Self {
    Self { password_hash: password_hash.filter(|h| !h.trim().is_empty()) }
  }

  /// Check `password` against the configured hash.
  pub fn verify(&self, password: &str) -> Result<(), ApiError> {
    let hash = self.password_hash.as_deref().ok_or(ApiError::AdminDisabled)?;

    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
      tracing::error!(error = %e, "configured admin password hash is malformed");
      ApiError::Unauthorized
    })?;

    Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .map_err(|_| ApiError::Unauthorized)
  }
}

#[derive(Debug, Deserialize)]
pub struct ResetBody {
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetOutcome {
  pub removed: usize,
}

/// `POST /admin/attendance/reset`, body: `{"password":"..."}`
pub async fn reset<S: Backend>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<ResetBody>,
) -> Result<Json<ResetOutcome>, ApiError> {
  state.admin.verify(&body.password).inspect_err(|e| {
    tracing::warn!(kind = e.kind(), "attendance reset refused");
  })?;
  let removed = state.attendance.reset_all().await?;
  Ok(Json(ResetOutcome { removed }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use argon2::{PasswordHasher, password_hash::SaltString};
  use rand_core::OsRng;

  fn hashed(password: &str) -> AdminConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AdminConfig::new(Some(hash))
  }

  #[test]
  fn correct_password() {
    assert!(hashed("secret").verify("secret").is_ok());
  }

  #[test]
  fn wrong_password() {
    assert!(matches!(hashed("secret").verify("nope"), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn missing_hash_disables_admin() {
    assert!(matches!(AdminConfig::new(None).verify("x"), Err(ApiError::AdminDisabled)));
    assert!(matches!(
      AdminConfig::new(Some("  ".into())).verify("x"),
      Err(ApiError::AdminDisabled)
    ));
  }

  #[test]
  fn malformed_hash_rejects() {
    let config = AdminConfig::new(Some("not-a-phc-string".into()));
    assert!(matches!(config.verify("x"), Err(ApiError::Unauthorized)));
  }
}
