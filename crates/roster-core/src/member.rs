//! Members: identity records owned by the member-management side of the
//! system. The attendance core only ever reads them.

use std::future::Future;

use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization as _, char::is_combining_mark};
use uuid::Uuid;

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipType {
  Regular,
  Associate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
  pub member_id:       Uuid,
  /// Business key from the membership roll; globally unique.
  pub external_id:     String,
  pub first_name:      String,
  pub last_name:       String,
  pub membership_type: MembershipType,
  pub contact:         Option<String>,
}

impl Member {
  /// `"Last, First"`, the form staff read off the roll.
  pub fn display_name(&self) -> String {
    format!("{}, {}", self.last_name, self.first_name)
  }

  pub fn summary(&self) -> MemberSummary {
    MemberSummary {
      first_name:      self.first_name.clone(),
      last_name:       self.last_name.clone(),
      membership_type: self.membership_type,
    }
  }
}

/// The display fields carried on feed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
  pub first_name:      String,
  pub last_name:       String,
  pub membership_type: MembershipType,
}

/// A member search hit with the member's most recent session, if any.
#[derive(Debug, Clone, Serialize)]
pub struct MemberMatch {
  pub member:         Member,
  pub latest_session: Option<Session>,
}

/// Input for seeding a member record.
#[derive(Debug, Clone)]
pub struct NewMember {
  pub external_id:     String,
  pub first_name:      String,
  pub last_name:       String,
  pub membership_type: MembershipType,
  pub contact:         Option<String>,
}

impl NewMember {
  pub fn new(
    external_id: impl Into<String>,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
  ) -> Self {
    Self {
      external_id:     external_id.into(),
      first_name:      first_name.into(),
      last_name:       last_name.into(),
      membership_type: MembershipType::Regular,
      contact:         None,
    }
  }
}

/// Lookup over the member roll.
pub trait MemberDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a member by id. Returns `None` if not found.
  fn get_member(
    &self,
    member_id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  /// Accent-insensitive name search; an all-digit query also matches the
  /// member holding that queue number. Short text queries match nothing.
  fn search_members<'a>(
    &'a self,
    query: &'a str,
  ) -> impl Future<Output = Result<Vec<MemberMatch>, Self::Error>> + Send + 'a;
}

// ─── Search normalisation ────────────────────────────────────────────────────

/// Fold a string for accent-insensitive matching: trimmed, decomposed to NFD
/// with every combining mark dropped, then lowercased. Applied to both the
/// query and the stored names, so `Niño`, `Nin\u{303}o` and `nino` agree.
pub fn fold_for_search(s: &str) -> String {
  s.trim()
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .flat_map(char::to_lowercase)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_name_is_last_comma_first() {
    let member = Member {
      member_id:       Uuid::new_v4(),
      external_id:     "M-001".into(),
      first_name:      "Ana".into(),
      last_name:       "Cruz".into(),
      membership_type: MembershipType::Associate,
      contact:         None,
    };
    assert_eq!(member.display_name(), "Cruz, Ana");
  }

  #[test]
  fn folding_strips_diacritics_both_ways() {
    assert_eq!(fold_for_search("  Niño "), "nino");
    assert_eq!(fold_for_search("PEÑA"), "pena");
    assert_eq!(fold_for_search("José Ramón"), "jose ramon");
    assert_eq!(fold_for_search("nino"), fold_for_search("Niño"));
  }

  #[test]
  fn folding_handles_decomposed_input() {
    assert_eq!(fold_for_search("Nin\u{303}o"), "nino");
    assert_eq!(fold_for_search("Pen\u{303}a"), fold_for_search("Peña"));
  }

  #[test]
  fn folding_covers_diacritics_beyond_spanish() {
    assert_eq!(fold_for_search("Ōkubo"), "okubo");
    assert_eq!(fold_for_search("Dąbrowski"), "dabrowski");
    assert_eq!(fold_for_search("Çelik Ünal"), "celik unal");
    assert_eq!(fold_for_search("Đorđe"), "đorđe");
  }
}
