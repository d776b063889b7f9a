//! Attendance sessions, one per member visit from check-in to check-out, and
//! the typed inputs that drive them.
//!
//! A session is open while [`Session::checkout`] is `None`. Checkout fills it
//! in exactly once; after that the session is terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Queue numbers ───────────────────────────────────────────────────────────

/// The positive integer printed on a physical stub.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct QueueNumber(i64);

impl QueueNumber {
  pub fn new(n: i64) -> Result<Self> {
    if n < 1 {
      return Err(Error::InvalidInput(format!(
        "queue number must be a positive integer, got {n}"
      )));
    }
    Ok(Self(n))
  }

  pub fn get(self) -> i64 { self.0 }
}

impl fmt::Display for QueueNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl TryFrom<i64> for QueueNumber {
  type Error = Error;

  fn try_from(n: i64) -> Result<Self> { Self::new(n) }
}

impl From<QueueNumber> for i64 {
  fn from(q: QueueNumber) -> Self { q.0 }
}

/// A queue number as it arrives from a client form: either a JSON number or
/// the text typed into the field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QueueNumberInput {
  Int(i64),
  Text(String),
  /// Anything else (floats, booleans, objects); always rejected.
  Other(serde::de::IgnoredAny),
}

impl TryFrom<QueueNumberInput> for QueueNumber {
  type Error = Error;

  fn try_from(input: QueueNumberInput) -> Result<Self> {
    match input {
      QueueNumberInput::Int(n) => Self::new(n),
      QueueNumberInput::Text(s) => {
        let trimmed = s.trim();
        let n = trimmed.parse::<i64>().map_err(|_| {
          Error::InvalidInput(format!("queue number must be an integer, got {trimmed:?}"))
        })?;
        Self::new(n)
      }
      QueueNumberInput::Other(_) => {
        Err(Error::InvalidInput("queue number must be an integer".into()))
      }
    }
  }
}

// ─── Actors ──────────────────────────────────────────────────────────────────

/// Who performed a transition. Supplied by the caller, never authenticated
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:   String,
  pub name: String,
}

impl Actor {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self { id: id.into(), name: name.into() }
  }
}

// ─── Claimants ───────────────────────────────────────────────────────────────

/// The trimmed, non-empty name of whoever collected on a member's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Claimant(String);

impl Claimant {
  pub fn new(name: impl AsRef<str>) -> Result<Self> {
    let trimmed = name.as_ref().trim();
    if trimmed.is_empty() {
      return Err(Error::MissingClaimant);
    }
    Ok(Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Claimant {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::new(s) }
}

impl From<Claimant> for String {
  fn from(c: Claimant) -> Self { c.0 }
}

// ─── Checkout actions ────────────────────────────────────────────────────────

/// The four ways a stub can come back across the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
  Correct,
  Mismatch,
  Proxy,
  Lost,
}

/// A checkout action together with the data it needs. Invalid combinations
/// (a mismatch with no number, a proxy with no name) cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CheckoutAction {
  Correct,
  Mismatch { number_given: QueueNumber },
  Proxy { claimed_by: Claimant },
  Lost,
}

impl CheckoutAction {
  /// Assemble an action from loosely-typed form fields. Fields that do not
  /// belong to `kind` are ignored.
  pub fn from_parts(
    kind: ActionKind,
    number_given: Option<QueueNumberInput>,
    claimed_by: Option<&str>,
  ) -> Result<Self> {
    Ok(match kind {
      ActionKind::Correct => Self::Correct,
      ActionKind::Lost => Self::Lost,
      ActionKind::Mismatch => Self::Mismatch {
        number_given: number_given.ok_or(Error::MissingNumberGiven)?.try_into()?,
      },
      ActionKind::Proxy => Self::Proxy {
        claimed_by: Claimant::new(claimed_by.ok_or(Error::MissingClaimant)?)?,
      },
    })
  }

  pub fn kind(&self) -> ActionKind {
    match self {
      Self::Correct => ActionKind::Correct,
      Self::Mismatch { .. } => ActionKind::Mismatch,
      Self::Proxy { .. } => ActionKind::Proxy,
      Self::Lost => ActionKind::Lost,
    }
  }

  /// The terminal record this action writes onto a session.
  ///
  /// A proxy collection is recorded as `Correct`: the right stub came back,
  /// only the hands were different.
  pub fn settle(&self, by: Actor, at: DateTime<Utc>) -> Checkout {
    let (status, number_given, claimed_by) = match self {
      Self::Correct => (SessionStatus::Correct, None, None),
      Self::Mismatch { number_given } => {
        (SessionStatus::Mismatch, Some(*number_given), None)
      }
      Self::Proxy { claimed_by } => {
        (SessionStatus::Correct, None, Some(claimed_by.as_str().to_owned()))
      }
      Self::Lost => (SessionStatus::Lost, None, None),
    };

    Checkout {
      at,
      by,
      status,
      number_given,
      claimed_by,
      stub_collected: status != SessionStatus::Lost,
    }
  }
}

/// Loose checkout input as submitted by a desk terminal; converted into a
/// [`CheckoutAction`] once the gate has been checked.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
  pub action:       ActionKind,
  pub number_given: Option<QueueNumberInput>,
  pub claimed_by:   Option<String>,
}

impl TryFrom<CheckoutRequest> for CheckoutAction {
  type Error = Error;

  fn try_from(req: CheckoutRequest) -> Result<Self> {
    Self::from_parts(req.action, req.number_given, req.claimed_by.as_deref())
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// How a session ended. Meaningful only once checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
  Correct,
  Mismatch,
  Lost,
}

/// The terminal half of a session, written once at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
  pub at:             DateTime<Utc>,
  pub by:             Actor,
  pub status:         SessionStatus,
  /// The stub actually presented; set only for [`SessionStatus::Mismatch`].
  pub number_given:   Option<QueueNumber>,
  /// Proxy claimant, if a third party collected.
  pub claimed_by:     Option<String>,
  /// False only for [`SessionStatus::Lost`].
  pub stub_collected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub session_id:   Uuid,
  pub member_id:    Uuid,
  pub queue_number: QueueNumber,
  pub checkin_at:   DateTime<Utc>,
  pub checkin_by:   Actor,
  pub checkout:     Option<Checkout>,
}

impl Session {
  pub fn is_open(&self) -> bool { self.checkout.is_none() }

  pub fn status(&self) -> Option<SessionStatus> {
    self.checkout.as_ref().map(|c| c.status)
  }
}

/// Input to [`crate::store::AttendanceStore::insert_session`].
#[derive(Debug, Clone)]
pub struct NewSession {
  pub member_id:    Uuid,
  pub queue_number: QueueNumber,
  pub actor:        Actor,
  pub at:           DateTime<Utc>,
}
