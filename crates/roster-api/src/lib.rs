//! JSON REST API for the attendance desk.
//!
//! Exposes an axum [`Router`] backed by any store implementing the
//! [`Backend`] bundle of `roster-core` traits. TLS and staff identity are the
//! caller's responsibility; only the destructive reset asks for a password.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roster_api::api_router(state))
//! ```

pub mod admin;
pub mod attendance;
pub mod error;
pub mod extract;
pub mod gate;
pub mod members;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use roster_core::{
  Error,
  gate::{EventTitle, GateControl, GateProvider},
  lifecycle::Attendance,
  member::MemberDirectory,
  store::AttendanceStore,
};

pub use admin::AdminConfig;
pub use error::ApiError;

// ─── Backend ──────────────────────────────────────────────────────────────────

/// Everything the API needs from one store: sessions, the member roll, and
/// writable event configuration, each with errors that lift into
/// [`roster_core::Error`].
pub trait Backend:
  AttendanceStore<Error: Into<Error>>
  + MemberDirectory<Error: Into<Error>>
  + GateProvider<Error: Into<Error>>
  + GateControl
  + EventTitle
  + Clone
  + 'static
{
}

impl<T> Backend for T where
  T: AttendanceStore<Error: Into<Error>>
    + MemberDirectory<Error: Into<Error>>
    + GateProvider<Error: Into<Error>>
    + GateControl
    + EventTitle
    + Clone
    + 'static
{
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct AppState<S> {
  /// The store doubles as the gate.
  pub attendance: Attendance<S, S>,
  pub admin:      Arc<AdminConfig>,
}

impl<S: Backend> AppState<S> {
  pub fn new(store: S, admin: AdminConfig) -> Self {
    Self {
      attendance: Attendance::new(store.clone(), store),
      admin:      Arc::new(admin),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the desk API router. State is applied here, so the result nests
/// under any parent router.
pub fn api_router<S: Backend>(state: AppState<S>) -> Router<()> {
  Router::new()
    // Event configuration
    .route("/event/gate", get(gate::show::<S>).put(gate::update::<S>))
    .route("/event/title", get(gate::show_title::<S>).put(gate::update_title::<S>))
    // Attendance
    .route("/attendance/checkin", post(attendance::check_in::<S>))
    .route("/attendance/{id}/checkout", post(attendance::check_out::<S>))
    .route("/attendance/open/{member_id}", get(attendance::open_for::<S>))
    .route("/attendance/recent", get(attendance::recent::<S>))
    // Members
    .route("/members/search", get(members::search::<S>))
    // Admin
    .route("/admin/attendance/reset", post(admin::reset::<S>))
    .with_state(state)
}
