//! The event gate: two admin-controlled switches that open and close the
//! check-in and check-out phases of an event. The event title lives beside
//! them in the same configuration.

use std::{convert::Infallible, fmt, future::Future};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which half of the attendance flow a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  CheckIn,
  CheckOut,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::CheckIn => f.write_str("check-in"),
      Self::CheckOut => f.write_str("check-out"),
    }
  }
}

/// Snapshot of the gate flags. A missing configuration reads as closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GateConfig {
  pub checkin_enabled:  bool,
  pub checkout_enabled: bool,
}

impl GateConfig {
  pub fn open() -> Self {
    Self { checkin_enabled: true, checkout_enabled: true }
  }

  pub fn allows(&self, phase: Phase) -> bool {
    match phase {
      Phase::CheckIn => self.checkin_enabled,
      Phase::CheckOut => self.checkout_enabled,
    }
  }
}

/// Source of the current gate flags, consulted before every transition.
pub trait GateProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn gate(&self) -> impl Future<Output = Result<GateConfig, Self::Error>> + Send + '_;
}

/// A gate whose flags can be changed at runtime (the admin toggle).
pub trait GateControl: GateProvider {
  /// Replace both flags; returns the stored configuration.
  fn set_gate(
    &self,
    config: GateConfig,
  ) -> impl Future<Output = Result<GateConfig, Self::Error>> + Send + '_;
}

/// The event title shown on desk terminals, stored with the gate flags.
pub trait EventTitle: GateProvider {
  fn title(&self) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Store an already-normalised title (see [`normalize_title`]).
  fn set_title(
    &self,
    title: String,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}

/// Trim a requested title; a blank one is rejected.
pub fn normalize_title(title: &str) -> Result<String> {
  let title = title.trim();
  if title.is_empty() {
    return Err(Error::InvalidInput("event title is required".into()));
  }
  Ok(title.to_owned())
}

/// A gate pinned to fixed flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedGate(pub GateConfig);

impl GateProvider for FixedGate {
  type Error = Infallible;

  async fn gate(&self) -> Result<GateConfig, Infallible> { Ok(self.0) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_gate_is_closed() {
    let gate = GateConfig::default();
    assert!(!gate.allows(Phase::CheckIn));
    assert!(!gate.allows(Phase::CheckOut));
  }

  #[test]
  fn titles_are_trimmed_and_never_blank() {
    assert_eq!(normalize_title("  General Assembly ").unwrap(), "General Assembly");
    assert!(matches!(normalize_title(" \t "), Err(Error::InvalidInput(_))));
    assert!(matches!(normalize_title(""), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn flags_are_independent() {
    let gate = GateConfig { checkin_enabled: true, checkout_enabled: false };
    assert!(gate.allows(Phase::CheckIn));
    assert!(!gate.allows(Phase::CheckOut));
  }
}
