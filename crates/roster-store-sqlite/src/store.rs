//! [`SqliteStore`]: the SQLite implementation of [`AttendanceStore`],
//! [`GateProvider`]/[`GateControl`]/[`EventTitle`] and [`MemberDirectory`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{ErrorCode, OptionalExtension as _, Transaction, TransactionBehavior};
use uuid::Uuid;

use roster_core::{
  Error as CoreError,
  feed::SessionRecord,
  gate::{EventTitle, GateConfig, GateControl, GateProvider},
  member::{Member, MemberDirectory, MemberMatch, NewMember, fold_for_search},
  reconcile::{Snapshot, reconcile},
  session::{Actor, CheckoutAction, NewSession, QueueNumber, Session},
  store::AttendanceStore,
};

use crate::{
  Error, Result,
  encode::{
    RawMember, RawSession, RawStub, encode_dt, encode_membership, encode_status,
    encode_uuid,
  },
  schema::SCHEMA,
};

/// How long a write waits on another connection's lock before reporting
/// [`roster_core::Error::Busy`].
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Most rows returned by `search_members`.
const SEARCH_LIMIT: i64 = 20;

/// Shortest non-numeric query `search_members` will run.
const MIN_TEXT_SEARCH_LEN: usize = 2;

// ─── SQL fragments ───────────────────────────────────────────────────────────

pub(crate) const SESSION_SELECT: &str = "
  SELECT a.session_id, a.member_id, a.queue_number, a.checkin_at,
         a.checkin_by, ci.name, a.checkout_at, a.checkout_by, co.name,
         a.status, a.checkout_number_given, a.claimed_by, a.stub_collected,
         m.first_name, m.last_name, m.membership_type
  FROM attendance a
  JOIN members m      ON m.member_id  = a.member_id
  JOIN actors  ci     ON ci.actor_id  = a.checkin_by
  LEFT JOIN actors co ON co.actor_id  = a.checkout_by";

pub(crate) const MEMBER_SELECT: &str = "
  SELECT m.member_id, m.external_id, m.first_name, m.last_name,
         m.membership_type, m.contact
  FROM members m";

pub(crate) const STUB_SELECT: &str = "
  SELECT session_id, queue_number, checkout_number_given,
         checkout_at IS NOT NULL, stub_collected
  FROM attendance";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
  }

  /// Like [`Self::open`], waiting at most `busy_timeout` on a locked database.
  pub async fn open_with_timeout(
    path: impl AsRef<Path>,
    busy_timeout: Duration,
  ) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init(busy_timeout).await?;
    tracing::debug!(path = %path.display(), ?busy_timeout, "attendance store opened");
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init(DEFAULT_BUSY_TIMEOUT).await?;
    Ok(store)
  }

  async fn init(&self, busy_timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Members ───────────────────────────────────────────────────────────────

  /// Insert a member record. Member management proper lives outside this
  /// crate; this exists to seed a roll.
  pub async fn add_member(&self, input: NewMember) -> Result<Member> {
    let member = Member {
      member_id:       Uuid::new_v4(),
      external_id:     input.external_id,
      first_name:      input.first_name,
      last_name:       input.last_name,
      membership_type: input.membership_type,
      contact:         input.contact,
    };

    let id_str       = encode_uuid(member.member_id);
    let external_id  = member.external_id.clone();
    let first_name   = member.first_name.clone();
    let last_name    = member.last_name.clone();
    let membership   = encode_membership(member.membership_type);
    let contact      = member.contact.clone();
    let search_first = fold_for_search(&member.first_name);
    let search_last  = fold_for_search(&member.last_name);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO members (
             member_id, external_id, first_name, last_name,
             membership_type, contact, search_first, search_last
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            external_id,
            first_name,
            last_name,
            membership,
            contact,
            search_first,
            search_last,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if constraint_message(&e).is_some_and(|m| m.contains("members.external_id")) => {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(
        CoreError::InvalidInput(format!(
          "a member with external id {:?} already exists",
          member.external_id
        ))
        .into(),
      );
    }
    Ok(member)
  }
}

// ─── Transaction bodies ──────────────────────────────────────────────────────

fn constraint_message(e: &rusqlite::Error) -> Option<&str> {
  match e {
    rusqlite::Error::SqliteFailure(f, msg) if f.code == ErrorCode::ConstraintViolation => {
      msg.as_deref()
    }
    _ => None,
  }
}

fn escape_like(s: &str) -> String {
  s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn upsert_actor(tx: &Transaction<'_>, actor: &Actor) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT INTO actors (actor_id, name) VALUES (?1, ?2)
     ON CONFLICT (actor_id) DO UPDATE SET name = excluded.name",
    rusqlite::params![actor.id, actor.name],
  )?;
  Ok(())
}

fn load_session(tx: &Transaction<'_>, session_id: Uuid) -> Result<Option<Session>> {
  let raw = tx
    .query_row(
      &format!("{SESSION_SELECT} WHERE a.session_id = ?1"),
      [encode_uuid(session_id)],
      RawSession::from_row,
    )
    .optional()?;
  raw.map(RawSession::into_session).transpose()
}

/// Display name of whoever holds `number`, for conflict messages.
fn holder_name(tx: &Transaction<'_>, number: QueueNumber) -> rusqlite::Result<Option<String>> {
  tx.query_row(
    "SELECT m.last_name || ', ' || m.first_name
     FROM attendance a JOIN members m ON m.member_id = a.member_id
     WHERE a.queue_number = ?1",
    [number.get()],
    |r| r.get(0),
  )
  .optional()
}

fn insert_in_tx(tx: &Transaction<'_>, session: &Session) -> Result<()> {
  upsert_actor(tx, &session.checkin_by)?;

  let result = tx.execute(
    "INSERT INTO attendance (session_id, member_id, queue_number, checkin_at, checkin_by)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      encode_uuid(session.session_id),
      encode_uuid(session.member_id),
      session.queue_number.get(),
      encode_dt(session.checkin_at),
      session.checkin_by.id,
    ],
  );

  let Err(e) = result else { return Ok(()) };
  let message = constraint_message(&e).map(str::to_owned);
  let conflict = match message.as_deref() {
    Some(m) if m.contains("attendance.queue_number") => CoreError::QueueNumberTaken {
      number: session.queue_number,
      holder: holder_name(tx, session.queue_number).ok().flatten(),
    },
    Some(m) if m.contains("attendance.member_id") => {
      CoreError::AlreadyCheckedIn(session.member_id)
    }
    Some(m) if m.contains("FOREIGN KEY") => CoreError::MemberNotFound(session.member_id),
    _ => return Err(e.into()),
  };
  Err(conflict.into())
}

fn close_in_tx(
  tx: &Transaction<'_>,
  session_id: Uuid,
  action: &CheckoutAction,
  by: Actor,
  at: DateTime<Utc>,
) -> Result<Session> {
  let session =
    load_session(tx, session_id)?.ok_or(CoreError::SessionNotFound(session_id))?;

  let probes = Snapshot::probe_numbers(&session, action);
  let first = probes[0].get();
  let second = probes.get(1).map_or(first, |q| q.get());

  let others = tx
    .prepare(&format!(
      "{STUB_SELECT}
       WHERE session_id <> ?1
         AND (queue_number IN (?2, ?3) OR checkout_number_given IN (?2, ?3))"
    ))?
    .query_map(
      rusqlite::params![encode_uuid(session_id), first, second],
      RawStub::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawStub::into_stub)
    .collect::<Result<Vec<_>>>()?;

  let snapshot = Snapshot::new(session, others);
  reconcile(&snapshot, action)?;

  let checkout = action.settle(by, at);
  upsert_actor(tx, &checkout.by)?;
  let updated = tx.execute(
    "UPDATE attendance SET
       checkout_at           = ?2,
       checkout_by           = ?3,
       status                = ?4,
       checkout_number_given = ?5,
       claimed_by            = ?6,
       stub_collected        = ?7
     WHERE session_id = ?1 AND checkout_at IS NULL",
    rusqlite::params![
      encode_uuid(session_id),
      encode_dt(checkout.at),
      checkout.by.id,
      encode_status(checkout.status),
      checkout.number_given.map(QueueNumber::get),
      checkout.claimed_by,
      checkout.stub_collected,
    ],
  )?;
  if updated == 0 {
    return Err(CoreError::AlreadyCheckedOut(session_id).into());
  }

  let mut session = snapshot.session;
  session.checkout = Some(checkout);
  Ok(session)
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = Error;

  async fn insert_session(&self, input: NewSession) -> Result<Session> {
    let session = Session {
      session_id:   Uuid::new_v4(),
      member_id:    input.member_id,
      queue_number: input.queue_number,
      checkin_at:   input.at,
      checkin_by:   input.actor,
      checkout:     None,
    };

    let row = session.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = insert_in_tx(&tx, &row);
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await??;

    Ok(session)
  }

  async fn close_session(
    &self,
    session_id: Uuid,
    action:     CheckoutAction,
    by:         Actor,
    at:         DateTime<Utc>,
  ) -> Result<Session> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = close_in_tx(&tx, session_id, &action, by, at);
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?
  }

  async fn reset_all(&self) -> Result<usize> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM attendance", [])?))
      .await?;
    Ok(removed)
  }

  async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>> {
    let id_str = encode_uuid(session_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SESSION_SELECT} WHERE a.session_id = ?1"),
              [id_str],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSession::into_session).transpose()
  }

  async fn open_session_for(&self, member_id: Uuid) -> Result<Option<Session>> {
    let id_str = encode_uuid(member_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SESSION_SELECT} WHERE a.member_id = ?1 AND a.checkout_at IS NULL"),
              [id_str],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSession::into_session).transpose()
  }

  async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);
    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SESSION_SELECT} ORDER BY a.checkin_at DESC, a.session_id LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map([limit_val], RawSession::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::into_record).collect()
  }
}

// ─── GateProvider impl ───────────────────────────────────────────────────────

impl GateProvider for SqliteStore {
  type Error = Error;

  async fn gate(&self) -> Result<GateConfig> {
    let gate = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT checkin_enabled, checkout_enabled FROM event_config WHERE id = 1",
              [],
              |r| {
                Ok(GateConfig {
                  checkin_enabled:  r.get(0)?,
                  checkout_enabled: r.get(1)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    Ok(gate.unwrap_or_default())
  }
}

impl GateControl for SqliteStore {
  async fn set_gate(&self, gate: GateConfig) -> Result<GateConfig> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE event_config SET checkin_enabled = ?1, checkout_enabled = ?2 WHERE id = 1",
          rusqlite::params![gate.checkin_enabled, gate.checkout_enabled],
        )?;
        Ok(())
      })
      .await?;
    Ok(gate)
  }
}

impl EventTitle for SqliteStore {
  async fn title(&self) -> Result<String> {
    let title: String = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT title FROM event_config WHERE id = 1", [], |r| r.get(0))?)
      })
      .await?;
    Ok(title)
  }

  async fn set_title(&self, title: String) -> Result<String> {
    let stored = title.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute("UPDATE event_config SET title = ?1 WHERE id = 1", [stored])?;
        Ok(())
      })
      .await?;
    Ok(title)
  }
}

// ─── MemberDirectory impl ────────────────────────────────────────────────────

impl MemberDirectory for SqliteStore {
  type Error = Error;

  async fn get_member(&self, member_id: Uuid) -> Result<Option<Member>> {
    let id_str = encode_uuid(member_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{MEMBER_SELECT} WHERE m.member_id = ?1"),
              [id_str],
              RawMember::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawMember::into_member).transpose()
  }

  /// Blank queries, and text queries shorter than two characters, return
  /// nothing.
  async fn search_members(&self, query: &str) -> Result<Vec<MemberMatch>> {
    let q = query.trim();
    let numeric = !q.is_empty() && q.bytes().all(|b| b.is_ascii_digit());
    if q.is_empty() || (!numeric && q.chars().count() < MIN_TEXT_SEARCH_LEN) {
      return Ok(Vec::new());
    }

    let pattern = format!("%{}%", escape_like(&fold_for_search(q)));
    let queue = if numeric { q.parse::<i64>().ok() } else { None };

    let raws: Vec<(RawMember, Option<RawSession>)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT DISTINCT m.member_id, m.external_id, m.first_name, m.last_name,
                  m.membership_type, m.contact
           FROM members m
           LEFT JOIN attendance a ON a.member_id = m.member_id
           WHERE m.search_first LIKE ?1 ESCAPE '\\'
              OR m.search_last  LIKE ?1 ESCAPE '\\'
              OR a.queue_number = ?2
           ORDER BY m.last_name, m.first_name
           LIMIT {SEARCH_LIMIT}"
        );
        let members = conn
          .prepare(&sql)?
          .query_map(rusqlite::params![pattern, queue], RawMember::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut latest = conn.prepare(&format!(
          "{SESSION_SELECT} WHERE a.member_id = ?1 ORDER BY a.checkin_at DESC LIMIT 1"
        ))?;
        let mut out = Vec::with_capacity(members.len());
        for m in members {
          let session = latest
            .query_row([&m.member_id], RawSession::from_row)
            .optional()?;
          out.push((m, session));
        }
        Ok(out)
      })
      .await?;

    raws
      .into_iter()
      .map(|(m, s)| -> Result<MemberMatch> {
        Ok(MemberMatch {
          member:         m.into_member()?,
          latest_session: s.map(RawSession::into_session).transpose()?,
        })
      })
      .collect()
  }
}
