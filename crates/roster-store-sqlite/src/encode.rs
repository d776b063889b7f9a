//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (nanosecond
//! precision, `Z` suffix) so lexical order in SQL equals chronological order.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use roster_core::{
  feed::SessionRecord,
  member::{Member, MemberSummary, MembershipType},
  reconcile::StubRecord,
  session::{Actor, Checkout, QueueNumber, Session, SessionStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── QueueNumber ──────────────────────────────────────────────────────────────

pub fn decode_queue(n: i64) -> Result<QueueNumber> {
  QueueNumber::new(n).map_err(|_| Error::Decode(format!("stored queue number {n}")))
}

// ─── SessionStatus ────────────────────────────────────────────────────────────

pub fn encode_status(s: SessionStatus) -> &'static str {
  match s {
    SessionStatus::Correct => "correct",
    SessionStatus::Mismatch => "mismatch",
    SessionStatus::Lost => "lost",
  }
}

pub fn decode_status(s: &str) -> Result<SessionStatus> {
  match s {
    "correct" => Ok(SessionStatus::Correct),
    "mismatch" => Ok(SessionStatus::Mismatch),
    "lost" => Ok(SessionStatus::Lost),
    other => Err(Error::Decode(format!("unknown session status: {other:?}"))),
  }
}

// ─── MembershipType ───────────────────────────────────────────────────────────

pub fn encode_membership(m: MembershipType) -> &'static str {
  match m {
    MembershipType::Regular => "regular",
    MembershipType::Associate => "associate",
  }
}

pub fn decode_membership(s: &str) -> Result<MembershipType> {
  match s {
    "regular" => Ok(MembershipType::Regular),
    "associate" => Ok(MembershipType::Associate),
    other => Err(Error::Decode(format!("unknown membership type: {other:?}"))),
  }
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// Columns selected by [`crate::store::SESSION_SELECT`], in order.
pub struct RawSession {
  pub session_id:            String,
  pub member_id:             String,
  pub queue_number:          i64,
  pub checkin_at:            String,
  pub checkin_by:            String,
  pub checkin_by_name:       String,
  pub checkout_at:           Option<String>,
  pub checkout_by:           Option<String>,
  pub checkout_by_name:      Option<String>,
  pub status:                Option<String>,
  pub checkout_number_given: Option<i64>,
  pub claimed_by:            Option<String>,
  pub stub_collected:        Option<bool>,
  pub first_name:            String,
  pub last_name:             String,
  pub membership_type:       String,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:            row.get(0)?,
      member_id:             row.get(1)?,
      queue_number:          row.get(2)?,
      checkin_at:            row.get(3)?,
      checkin_by:            row.get(4)?,
      checkin_by_name:       row.get(5)?,
      checkout_at:           row.get(6)?,
      checkout_by:           row.get(7)?,
      checkout_by_name:      row.get(8)?,
      status:                row.get(9)?,
      checkout_number_given: row.get(10)?,
      claimed_by:            row.get(11)?,
      stub_collected:        row.get(12)?,
      first_name:            row.get(13)?,
      last_name:             row.get(14)?,
      membership_type:       row.get(15)?,
    })
  }

  fn decode_checkout(&self) -> Result<Option<Checkout>> {
    let Some(at) = &self.checkout_at else {
      return Ok(None);
    };
    let missing = |col: &str| {
      Error::Decode(format!("session {} closed without {col}", self.session_id))
    };

    Ok(Some(Checkout {
      at:             decode_dt(at)?,
      by:             Actor {
        id:   self.checkout_by.clone().ok_or_else(|| missing("checkout_by"))?,
        name: self.checkout_by_name.clone().ok_or_else(|| missing("checkout_by"))?,
      },
      status:         decode_status(self.status.as_deref().ok_or_else(|| missing("status"))?)?,
      number_given:   self.checkout_number_given.map(decode_queue).transpose()?,
      claimed_by:     self.claimed_by.clone(),
      stub_collected: self.stub_collected.ok_or_else(|| missing("stub_collected"))?,
    }))
  }

  pub fn into_session(self) -> Result<Session> {
    let checkout = self.decode_checkout()?;
    Ok(Session {
      session_id: decode_uuid(&self.session_id)?,
      member_id: decode_uuid(&self.member_id)?,
      queue_number: decode_queue(self.queue_number)?,
      checkin_at: decode_dt(&self.checkin_at)?,
      checkin_by: Actor { id: self.checkin_by, name: self.checkin_by_name },
      checkout,
    })
  }

  pub fn into_record(self) -> Result<SessionRecord> {
    let member = MemberSummary {
      first_name:      self.first_name.clone(),
      last_name:       self.last_name.clone(),
      membership_type: decode_membership(&self.membership_type)?,
    };
    Ok(SessionRecord { session: self.into_session()?, member })
  }
}

/// Columns selected by [`crate::store::MEMBER_SELECT`], in order.
pub struct RawMember {
  pub member_id:       String,
  pub external_id:     String,
  pub first_name:      String,
  pub last_name:       String,
  pub membership_type: String,
  pub contact:         Option<String>,
}

impl RawMember {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      member_id:       row.get(0)?,
      external_id:     row.get(1)?,
      first_name:      row.get(2)?,
      last_name:       row.get(3)?,
      membership_type: row.get(4)?,
      contact:         row.get(5)?,
    })
  }

  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      member_id:       decode_uuid(&self.member_id)?,
      external_id:     self.external_id,
      first_name:      self.first_name,
      last_name:       self.last_name,
      membership_type: decode_membership(&self.membership_type)?,
      contact:         self.contact,
    })
  }
}

/// Columns selected by [`crate::store::STUB_SELECT`], in order.
pub struct RawStub {
  pub session_id:     String,
  pub queue_number:   i64,
  pub number_given:   Option<i64>,
  pub closed:         bool,
  pub stub_collected: Option<bool>,
}

impl RawStub {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:     row.get(0)?,
      queue_number:   row.get(1)?,
      number_given:   row.get(2)?,
      closed:         row.get(3)?,
      stub_collected: row.get(4)?,
    })
  }

  pub fn into_stub(self) -> Result<StubRecord> {
    Ok(StubRecord {
      session_id:     decode_uuid(&self.session_id)?,
      queue_number:   decode_queue(self.queue_number)?,
      number_given:   self.number_given.map(decode_queue).transpose()?,
      closed:         self.closed,
      stub_collected: self.closed && self.stub_collected.unwrap_or(false),
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let base = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
    let whole = encode_dt(base);
    let fractional = encode_dt(base + Duration::nanoseconds(1_500));
    assert_eq!(whole.len(), fractional.len());
    assert!(whole < fractional);
    assert_eq!(decode_dt(&fractional).unwrap(), base + Duration::nanoseconds(1_500));
  }

  #[test]
  fn unknown_status_is_a_decode_error() {
    assert!(matches!(decode_status("Correct"), Err(Error::Decode(_))));
    assert_eq!(decode_status("lost").unwrap(), SessionStatus::Lost);
  }
}
