//! Stub reconciliation: the checkout-time decision over which physical stub
//! is being settled.
//!
//! The decision is a pure function of a [`Snapshot`]: the session being closed
//! plus every other row whose numbers could collide with it. Storage backends
//! gather the snapshot and apply the verdict inside a single transaction.
//!
//! Rules:
//!
//! - A **mismatch** presenting stub `n` is refused when another session already
//!   recorded `n` as its mismatch stub, or when the session that was issued `n`
//!   has already closed with its stub collected.
//! - A **correct** or **proxy** return of stub `q` (the session's own number) is
//!   refused when another session already recorded `q` as its mismatch stub;
//!   that earlier claim wins until someone investigates.
//! - A **lost** stub settles nothing and is never refused on stub grounds.

use uuid::Uuid;

use crate::{
  Error, Result,
  session::{CheckoutAction, QueueNumber, Session},
};

/// The stub-relevant projection of some other attendance row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubRecord {
  pub session_id:     Uuid,
  pub queue_number:   QueueNumber,
  /// Mismatch stub recorded at that row's checkout, if any.
  pub number_given:   Option<QueueNumber>,
  pub closed:         bool,
  pub stub_collected: bool,
}

impl StubRecord {
  pub fn from_session(session: &Session) -> Self {
    Self {
      session_id:     session.session_id,
      queue_number:   session.queue_number,
      number_given:   session.checkout.as_ref().and_then(|c| c.number_given),
      closed:         !session.is_open(),
      stub_collected: session.checkout.as_ref().is_some_and(|c| c.stub_collected),
    }
  }

  /// True if this row has already settled the physical stub `n`.
  fn settled(&self, n: QueueNumber) -> bool {
    self.number_given == Some(n)
      || (self.queue_number == n && self.closed && self.stub_collected)
  }
}

/// The target session and its potentially colliding neighbours.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub session: Session,
  pub others:  Vec<StubRecord>,
}

impl Snapshot {
  /// Build a snapshot; any record for the target session itself is dropped.
  pub fn new(session: Session, others: impl IntoIterator<Item = StubRecord>) -> Self {
    let id = session.session_id;
    Self {
      session,
      others: others.into_iter().filter(|r| r.session_id != id).collect(),
    }
  }

  /// The numbers a backend must look up to build a complete snapshot for
  /// `action`: rows whose queue number or mismatch stub equals any of these.
  pub fn probe_numbers(session: &Session, action: &CheckoutAction) -> Vec<QueueNumber> {
    match action {
      CheckoutAction::Mismatch { number_given } => {
        vec![session.queue_number, *number_given]
      }
      _ => vec![session.queue_number],
    }
  }
}

/// Decide whether `action` may close the snapshot's session.
pub fn reconcile(snapshot: &Snapshot, action: &CheckoutAction) -> Result<()> {
  let session = &snapshot.session;
  if !session.is_open() {
    return Err(Error::AlreadyCheckedOut(session.session_id));
  }

  match action {
    CheckoutAction::Mismatch { number_given } => {
      if snapshot.others.iter().any(|r| r.settled(*number_given)) {
        return Err(Error::StubAlreadyClaimed(*number_given));
      }
    }
    CheckoutAction::Correct | CheckoutAction::Proxy { .. } => {
      let own = session.queue_number;
      if snapshot.others.iter().any(|r| r.number_given == Some(own)) {
        return Err(Error::StubAlreadyClaimedElsewhere(own));
      }
    }
    CheckoutAction::Lost => {}
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use chrono::Utc;
  use proptest::prelude::*;

  use super::*;
  use crate::session::{Actor, Claimant};

  fn q(n: i64) -> QueueNumber { QueueNumber::new(n).unwrap() }

  fn open_session(n: i64) -> Session {
    Session {
      session_id:   Uuid::new_v4(),
      member_id:    Uuid::new_v4(),
      queue_number: q(n),
      checkin_at:   Utc::now(),
      checkin_by:   Actor::new("u-1", "desk one"),
      checkout:     None,
    }
  }

  fn open_record(n: i64) -> StubRecord {
    StubRecord {
      session_id:     Uuid::new_v4(),
      queue_number:   q(n),
      number_given:   None,
      closed:         false,
      stub_collected: false,
    }
  }

  fn closed_record(n: i64, given: Option<i64>, collected: bool) -> StubRecord {
    StubRecord {
      session_id:     Uuid::new_v4(),
      queue_number:   q(n),
      number_given:   given.map(q),
      closed:         true,
      stub_collected: collected,
    }
  }

  fn proxy() -> CheckoutAction {
    CheckoutAction::Proxy { claimed_by: Claimant::new("Jane Doe").unwrap() }
  }

  #[test]
  fn closed_session_is_rejected_first() {
    let mut session = open_session(10);
    session.checkout = Some(CheckoutAction::Correct.settle(Actor::new("u", "u"), Utc::now()));
    let id = session.session_id;
    let snap = Snapshot::new(session, Vec::new());
    assert!(matches!(
      reconcile(&snap, &CheckoutAction::Lost),
      Err(Error::AlreadyCheckedOut(got)) if got == id
    ));
  }

  #[test]
  fn mismatch_against_open_holder_is_allowed() {
    let snap = Snapshot::new(open_session(10), [open_record(20)]);
    let action = CheckoutAction::Mismatch { number_given: q(20) };
    assert!(reconcile(&snap, &action).is_ok());
  }

  #[test]
  fn mismatch_on_stub_already_given_elsewhere_is_rejected() {
    let snap = Snapshot::new(open_session(10), [closed_record(30, Some(20), true)]);
    let action = CheckoutAction::Mismatch { number_given: q(20) };
    assert!(matches!(
      reconcile(&snap, &action),
      Err(Error::StubAlreadyClaimed(n)) if n == q(20)
    ));
  }

  #[test]
  fn mismatch_on_stub_collected_by_its_holder_is_rejected() {
    let snap = Snapshot::new(open_session(10), [closed_record(20, None, true)]);
    let action = CheckoutAction::Mismatch { number_given: q(20) };
    assert!(matches!(reconcile(&snap, &action), Err(Error::StubAlreadyClaimed(_))));
  }

  #[test]
  fn mismatch_on_stub_its_holder_lost_is_allowed() {
    let snap = Snapshot::new(open_session(10), [closed_record(20, None, false)]);
    let action = CheckoutAction::Mismatch { number_given: q(20) };
    assert!(reconcile(&snap, &action).is_ok());
  }

  #[test]
  fn correct_and_proxy_blocked_by_prior_mismatch_claim() {
    let claim = closed_record(10, Some(20), true);
    let snap = Snapshot::new(open_session(20), [claim]);

    for action in [CheckoutAction::Correct, proxy()] {
      assert!(matches!(
        reconcile(&snap, &action),
        Err(Error::StubAlreadyClaimedElsewhere(n)) if n == q(20)
      ));
    }
  }

  #[test]
  fn lost_is_never_blocked_on_stub_grounds() {
    let claim = closed_record(10, Some(20), true);
    let snap = Snapshot::new(open_session(20), [claim]);
    assert!(reconcile(&snap, &CheckoutAction::Lost).is_ok());
  }

  #[test]
  fn target_row_is_ignored_in_others() {
    let session = open_session(10);
    let mut own = StubRecord::from_session(&session);
    own.number_given = Some(q(10));
    let snap = Snapshot::new(session, [own]);
    assert!(snap.others.is_empty());
    assert!(reconcile(&snap, &CheckoutAction::Correct).is_ok());
  }

  #[test]
  fn probe_numbers_cover_presented_stub() {
    let session = open_session(10);
    let action = CheckoutAction::Mismatch { number_given: q(20) };
    assert_eq!(Snapshot::probe_numbers(&session, &action), vec![q(10), q(20)]);
    assert_eq!(Snapshot::probe_numbers(&session, &CheckoutAction::Lost), vec![q(10)]);
  }

  // ─── Properties ────────────────────────────────────────────────────────────

  fn arb_record() -> impl Strategy<Value = StubRecord> {
    (1i64..8, proptest::option::of(1i64..8), any::<bool>(), any::<bool>()).prop_map(
      |(n, given, closed, collected)| StubRecord {
        session_id:     Uuid::new_v4(),
        queue_number:   q(n),
        number_given:   if closed { given.map(q) } else { None },
        closed,
        stub_collected: closed && collected,
      },
    )
  }

  fn arb_action() -> impl Strategy<Value = CheckoutAction> {
    prop_oneof![
      Just(CheckoutAction::Correct),
      Just(CheckoutAction::Lost),
      Just(proxy()),
      (1i64..8).prop_map(|n| CheckoutAction::Mismatch { number_given: q(n) }),
    ]
  }

  proptest! {
    /// Replaying accepted checkouts one after another never leaves the same
    /// physical stub settled twice, counting both mismatch claims on it and
    /// correct or proxy returns by the session that was issued it. Issued
    /// numbers are distinct, as the store guarantees.
    #[test]
    fn no_stub_is_settled_twice(
      targets in proptest::collection::vec((1i64..8, arb_action()), 1..12),
    ) {
      let mut ledger: Vec<StubRecord> = Vec::new();
      let mut issued = HashSet::new();

      for (n, action) in targets {
        if !issued.insert(n) {
          continue;
        }
        let session = open_session(n);
        let snap = Snapshot::new(session.clone(), ledger.clone());
        if reconcile(&snap, &action).is_err() {
          continue;
        }

        let mut closed = session;
        closed.checkout = Some(action.settle(Actor::new("u", "u"), Utc::now()));
        ledger.push(StubRecord::from_session(&closed));
      }

      for stub in 1i64..8 {
        let mismatch_claims = ledger
          .iter()
          .filter(|r| r.number_given == Some(q(stub)))
          .count();
        let returned_by_holder = ledger
          .iter()
          .filter(|r| {
            r.queue_number == q(stub) && r.stub_collected && r.number_given.is_none()
          })
          .count();
        let settlements = mismatch_claims + returned_by_holder;
        prop_assert!(
          settlements <= 1,
          "stub #{stub} settled {settlements} times ({mismatch_claims} mismatch, {returned_by_holder} return)"
        );
      }
    }

    #[test]
    fn lost_always_accepted_on_open_session(
      n in 1i64..8,
      others in proptest::collection::vec(arb_record(), 0..10),
    ) {
      let snap = Snapshot::new(open_session(n), others);
      prop_assert!(reconcile(&snap, &CheckoutAction::Lost).is_ok());
    }

    #[test]
    fn decision_is_deterministic(
      n in 1i64..8,
      action in arb_action(),
      others in proptest::collection::vec(arb_record(), 0..10),
    ) {
      let snap = Snapshot::new(open_session(n), others);
      let first = reconcile(&snap, &action).map_err(|e| e.kind());
      let second = reconcile(&snap, &action).map_err(|e| e.kind());
      prop_assert_eq!(first, second);
    }
  }
}
