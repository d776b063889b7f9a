//! Error type for `roster-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A transition the domain rules refused.
  #[error(transparent)]
  Core(#[from] roster_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be mapped back onto a domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(e.into()) }
}

impl Error {
  /// True if SQLite reported lock contention (`SQLITE_BUSY` / `SQLITE_LOCKED`).
  pub fn is_busy(&self) -> bool {
    let Self::Database(tokio_rusqlite::Error::Rusqlite(
      rusqlite::Error::SqliteFailure(failure, _),
    )) = self
    else {
      return false;
    };
    matches!(
      failure.code,
      ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
    )
  }
}

impl From<Error> for roster_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      busy if busy.is_busy() => roster_core::Error::Busy,
      other => roster_core::Error::storage(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
