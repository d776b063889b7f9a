//! The session lifecycle: `NoSession → Open → Closed(status)`.
//!
//! [`Attendance`] is the single entry point collaborators call. It consults
//! the event gate before every transition, validates input, and hands the
//! atomic part of each transition to the [`AttendanceStore`].

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  feed::{self, FeedEvent},
  gate::{self, EventTitle, GateConfig, GateControl, GateProvider, Phase},
  member::{MemberDirectory, MemberMatch},
  session::{Actor, CheckoutAction, NewSession, QueueNumber, Session},
  store::AttendanceStore,
};

/// Check-in / check-out service over a store `S` and gate `G`.
///
/// Cloning is as cheap as cloning `S` and `G`.
#[derive(Debug, Clone)]
pub struct Attendance<S, G> {
  store: S,
  gate:  G,
}

impl<S, G> Attendance<S, G>
where
  S: AttendanceStore + MemberDirectory,
  G: GateProvider,
  <S as AttendanceStore>::Error: Into<Error>,
  <S as MemberDirectory>::Error: Into<Error>,
  G::Error: Into<Error>,
{
  pub fn new(store: S, gate: G) -> Self { Self { store, gate } }

  pub fn store(&self) -> &S { &self.store }

  pub fn gate(&self) -> &G { &self.gate }

  /// Fail with [`Error::GateClosed`] unless `phase` is currently enabled.
  pub async fn require(&self, phase: Phase) -> Result<()> {
    let config = self.gate.gate().await.map_err(lift)?;
    if !config.allows(phase) {
      tracing::debug!(%phase, "gate closed");
      return Err(Error::GateClosed(phase));
    }
    Ok(())
  }

  /// Open a session for `member_id` holding stub `queue_number`.
  ///
  /// The open-session pre-read is best effort; the store's uniqueness
  /// constraints decide any race.
  pub async fn check_in<Q>(
    &self,
    member_id: Uuid,
    queue_number: Q,
    actor: Actor,
  ) -> Result<Session>
  where
    Q: TryInto<QueueNumber> + Send,
    Q::Error: Into<Error>,
  {
    self.require(Phase::CheckIn).await?;
    let queue_number: QueueNumber = queue_number.try_into().map_err(lift)?;

    self
      .store
      .get_member(member_id)
      .await
      .map_err(lift)?
      .ok_or(Error::MemberNotFound(member_id))?;

    if self
      .store
      .open_session_for(member_id)
      .await
      .map_err(lift)?
      .is_some()
    {
      return Err(Error::AlreadyCheckedIn(member_id));
    }

    let input = NewSession { member_id, queue_number, actor, at: Utc::now() };
    let session = self
      .store
      .insert_session(input)
      .await
      .map_err(lift)
      .inspect_err(|e| log_rejection("check-in", e))?;

    tracing::info!(
      session_id = %session.session_id,
      %member_id,
      queue_number = %session.queue_number,
      actor = %session.checkin_by.id,
      "checked in"
    );
    Ok(session)
  }

  /// Close `session_id` with `action`. Not idempotent: a second call on the
  /// same session fails with [`Error::AlreadyCheckedOut`].
  pub async fn check_out<A>(
    &self,
    session_id: Uuid,
    action: A,
    actor: Actor,
  ) -> Result<Session>
  where
    A: TryInto<CheckoutAction> + Send,
    A::Error: Into<Error>,
  {
    self.require(Phase::CheckOut).await?;
    let action: CheckoutAction = action.try_into().map_err(lift)?;
    let kind = action.kind();

    let session = self
      .store
      .close_session(session_id, action, actor, Utc::now())
      .await
      .map_err(lift)
      .inspect_err(|e| log_rejection("check-out", e))?;

    if let Some(checkout) = &session.checkout {
      tracing::info!(
        %session_id,
        queue_number = %session.queue_number,
        action = ?kind,
        status = ?checkout.status,
        actor = %checkout.by.id,
        "checked out"
      );
    }
    Ok(session)
  }

  pub async fn get_open_session(&self, member_id: Uuid) -> Result<Option<Session>> {
    self.store.open_session_for(member_id).await.map_err(lift)
  }

  /// The activity feed, newest first. `None` uses [`feed::DEFAULT_FEED_LIMIT`];
  /// requests above [`feed::MAX_FEED_LIMIT`] are clamped.
  pub async fn list_recent_events(&self, limit: Option<usize>) -> Result<Vec<FeedEvent>> {
    let limit = feed::clamp_limit(limit);
    let records = self
      .store
      .recent_sessions(feed::session_window(limit))
      .await
      .map_err(lift)?;
    Ok(feed::project(&records, limit))
  }

  /// Purge every session. Callers gate this on admin re-authentication.
  pub async fn reset_all(&self) -> Result<usize> {
    let removed = self.store.reset_all().await.map_err(lift)?;
    tracing::warn!(removed, "attendance table reset");
    Ok(removed)
  }

  pub async fn current_gate(&self) -> Result<GateConfig> {
    self.gate.gate().await.map_err(lift)
  }

  pub async fn search_members(&self, query: &str) -> Result<Vec<MemberMatch>> {
    self.store.search_members(query).await.map_err(lift)
  }
}

impl<S, G> Attendance<S, G>
where
  G: GateControl,
  G::Error: Into<Error>,
{
  pub async fn set_gate(&self, config: GateConfig) -> Result<GateConfig> {
    let stored = self.gate.set_gate(config).await.map_err(lift)?;
    tracing::info!(
      checkin = stored.checkin_enabled,
      checkout = stored.checkout_enabled,
      "event gate updated"
    );
    Ok(stored)
  }
}

impl<S, G> Attendance<S, G>
where
  G: EventTitle,
  G::Error: Into<Error>,
{
  pub async fn title(&self) -> Result<String> { self.gate.title().await.map_err(lift) }

  /// Rename the event. Surrounding whitespace is dropped; a blank title is
  /// [`Error::InvalidInput`].
  pub async fn set_title(&self, title: &str) -> Result<String> {
    let title = gate::normalize_title(title)?;
    let stored = self.gate.set_title(title).await.map_err(lift)?;
    tracing::info!(title = %stored, "event title updated");
    Ok(stored)
  }
}

fn lift<E: Into<Error>>(e: E) -> Error { e.into() }

fn log_rejection(op: &'static str, e: &Error) {
  match e {
    Error::Busy => tracing::warn!(op, "store busy"),
    Error::Storage(source) => tracing::error!(op, error = %source, "storage failure"),
    other => tracing::warn!(op, kind = other.kind(), "{other}"),
  }
}
