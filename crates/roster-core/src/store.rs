//! The `AttendanceStore` trait.
//!
//! Implemented by storage backends (e.g. `roster-store-sqlite`). The
//! lifecycle service in [`crate::lifecycle`] depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  feed::SessionRecord,
  session::{Actor, CheckoutAction, NewSession, Session},
};

/// Abstraction over an attendance table.
///
/// Backends own the atomicity guarantees: queue-number uniqueness must be
/// decided by the storage layer at insert time, and a checkout's
/// reconciliation reads must share one transaction with its write.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AttendanceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Atomically insert a new open session.
  ///
  /// Must fail with a queue-number conflict if any stored session already
  /// holds `input.queue_number`, without a separate read beforehand.
  fn insert_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Close an open session with `action`.
  ///
  /// Inside one transaction: load the session, gather the
  /// [`crate::reconcile::Snapshot`], run [`crate::reconcile::reconcile`],
  /// and write [`CheckoutAction::settle`]'s record only if it accepts.
  fn close_session(
    &self,
    session_id: Uuid,
    action: CheckoutAction,
    by: Actor,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Delete every session; returns how many were removed.
  fn reset_all(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// The member's open session, if any.
  fn open_session_for(
    &self,
    member_id: Uuid,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// The `limit` most recently checked-in sessions, newest first, joined
  /// with member display fields.
  fn recent_sessions(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SessionRecord>, Self::Error>> + Send + '_;
}
