//! The activity feed: check-ins and check-outs interleaved newest first.
//!
//! Derived, never stored: [`project`] rebuilds it from session rows on every
//! read.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  member::MemberSummary,
  session::{QueueNumber, Session, SessionStatus},
};

/// Events returned when the caller does not ask for a specific count.
pub const DEFAULT_FEED_LIMIT: usize = 40;

/// Most-recent sessions (by check-in time) read to build a feed.
pub const FEED_SESSION_WINDOW: usize = 60;

/// Largest feed a caller may request; bigger limits are clamped to it.
pub const MAX_FEED_LIMIT: usize = 200;

/// The effective event count for a requested `limit`.
pub fn clamp_limit(limit: Option<usize>) -> usize {
  limit.unwrap_or(DEFAULT_FEED_LIMIT).min(MAX_FEED_LIMIT)
}

/// How many sessions a backend should read to serve a feed of `limit` events.
/// Never more than [`MAX_FEED_LIMIT`].
pub fn session_window(limit: usize) -> usize {
  limit.min(MAX_FEED_LIMIT).max(FEED_SESSION_WINDOW)
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
  Checkin,
  Checkout,
}

/// A session row joined with its member's display fields.
#[derive(Debug, Clone)]
pub struct SessionRecord {
  pub session: Session,
  pub member:  MemberSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
  /// `in-<session>` or `out-<session>`; unique within a feed.
  pub id:             String,
  #[serde(rename = "type")]
  pub kind:           FeedKind,
  pub timestamp:      DateTime<Utc>,
  pub session_id:     Uuid,
  pub queue_number:   QueueNumber,
  pub member:         MemberSummary,
  /// Display name of the staff member who performed the transition.
  pub by:             String,
  pub status:         Option<SessionStatus>,
  pub claimed_by:     Option<String>,
  pub stub_collected: Option<bool>,
}

fn events_for(record: &SessionRecord) -> impl Iterator<Item = FeedEvent> + '_ {
  let s = &record.session;

  let checkin = FeedEvent {
    id:             format!("in-{}", s.session_id),
    kind:           FeedKind::Checkin,
    timestamp:      s.checkin_at,
    session_id:     s.session_id,
    queue_number:   s.queue_number,
    member:         record.member.clone(),
    by:             s.checkin_by.name.clone(),
    status:         None,
    claimed_by:     None,
    stub_collected: None,
  };

  let checkout = s.checkout.as_ref().map(|c| FeedEvent {
    id:             format!("out-{}", s.session_id),
    kind:           FeedKind::Checkout,
    timestamp:      c.at,
    session_id:     s.session_id,
    queue_number:   s.queue_number,
    member:         record.member.clone(),
    by:             c.by.name.clone(),
    status:         Some(c.status),
    claimed_by:     c.claimed_by.clone(),
    stub_collected: Some(c.stub_collected),
  });

  std::iter::once(checkin).chain(checkout)
}

/// Newest first; equal timestamps fall back to session id, then checkout
/// before check-in so a same-instant pair still reads in causal order.
fn feed_order(a: &FeedEvent, b: &FeedEvent) -> Ordering {
  b.timestamp
    .cmp(&a.timestamp)
    .then_with(|| a.session_id.cmp(&b.session_id))
    .then_with(|| b.kind.cmp(&a.kind))
}

/// Project session rows into at most `limit` feed events, newest first.
pub fn project(records: &[SessionRecord], limit: usize) -> Vec<FeedEvent> {
  let mut events: Vec<FeedEvent> = records.iter().flat_map(events_for).collect();
  events.sort_by(feed_order);
  events.truncate(limit);
  events
}
