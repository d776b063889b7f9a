//! Error types for `roster-core`.
//!
//! Every rejected transition surfaces as one of these variants and leaves the
//! store untouched.

use std::convert::Infallible;

use thiserror::Error;
use uuid::Uuid;

use crate::{gate::Phase, session::QueueNumber};

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} is not currently available")]
  GateClosed(Phase),

  #[error("member {0} is already checked in")]
  AlreadyCheckedIn(Uuid),

  #[error("session {0} is already checked out")]
  AlreadyCheckedOut(Uuid),

  #[error(
    "queue #{number} is already assigned to {}",
    .holder.as_deref().unwrap_or("another member")
  )]
  QueueNumberTaken {
    number: QueueNumber,
    /// Display name of the member holding the number, when it could be read.
    holder: Option<String>,
  },

  #[error("stub #{0} was already claimed in another checkout record")]
  StubAlreadyClaimed(QueueNumber),

  #[error("stub #{0} was already claimed by another member's mismatch checkout")]
  StubAlreadyClaimedElsewhere(QueueNumber),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("a mismatch checkout requires the stub number given")]
  MissingNumberGiven,

  #[error("a proxy checkout requires the claimant's name")]
  MissingClaimant,

  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("member not found: {0}")]
  MemberNotFound(Uuid),

  #[error("the store is busy, please try again")]
  Busy,

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Stable machine-readable code for API clients.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::GateClosed(_) => "gate_closed",
      Self::AlreadyCheckedIn(_) => "already_checked_in",
      Self::AlreadyCheckedOut(_) => "already_checked_out",
      Self::QueueNumberTaken { .. } => "queue_number_taken",
      Self::StubAlreadyClaimed(_) => "stub_already_claimed",
      Self::StubAlreadyClaimedElsewhere(_) => "stub_already_claimed_elsewhere",
      Self::InvalidInput(_) => "invalid_input",
      Self::MissingNumberGiven => "missing_number_given",
      Self::MissingClaimant => "missing_claimant",
      Self::SessionNotFound(_) => "session_not_found",
      Self::MemberNotFound(_) => "member_not_found",
      Self::Busy => "busy",
      Self::Storage(_) => "storage",
    }
  }

  /// Only transient contention is safe to retry without operator input.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Busy) }

  /// Wrap an opaque backend failure.
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

impl From<Infallible> for Error {
  fn from(e: Infallible) -> Self { match e {} }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
