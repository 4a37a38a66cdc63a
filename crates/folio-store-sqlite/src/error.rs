//! Error type for `folio-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] folio_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown category: {0:?}")]
  UnknownCategory(String),

  #[error("malformed cursor: {0}")]
  Cursor(String),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Collapse backend failures into the client-facing taxonomy. Anything that
/// is not a domain outcome is reported as a (retryable) unavailable backend.
impl From<Error> for folio_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Cursor(m) => folio_core::Error::InvalidCursor(m),
      other => folio_core::Error::Unavailable(other.to_string()),
    }
  }
}
