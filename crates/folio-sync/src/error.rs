//! Error type for `folio-sync`.
//!
//! The type is `Clone` because one fetch outcome is handed to every caller
//! that was waiting on the same cache key.

use folio_core::post::PostId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// A write targeted a post that does not exist. Reads report absence as
  /// `Ok(None)` instead.
  #[error("post not found: {0}")]
  NotFound(PostId),

  /// The store refused a write for the calling principal.
  #[error("permission denied: {0}")]
  PermissionDenied(String),

  #[error("not signed in")]
  Unauthenticated,

  /// A non-retryable refusal: invalid input, bad credentials, a cursor the
  /// store does not recognise.
  #[error("rejected: {0}")]
  Rejected(String),

  /// Network, timeout or service failure. The user may re-trigger the action.
  #[error("store unavailable: {0}")]
  Transient(String),

  /// A cache key was read back as a different type than it was stored as.
  #[error("cached value under {0} has a different type")]
  TypeMismatch(String),
}

impl Error {
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Transient(_)) }
}

impl From<folio_core::Error> for Error {
  fn from(err: folio_core::Error) -> Self {
    use folio_core::Error as Core;
    match err {
      Core::PostNotFound(id) => Self::NotFound(id),
      e @ Core::PermissionDenied { .. } => Self::PermissionDenied(e.to_string()),
      Core::Unauthenticated => Self::Unauthenticated,
      Core::Unavailable(m) => Self::Transient(m),
      e @ (Core::EmailInUse
      | Core::InvalidEmail
      | Core::WeakPassword
      | Core::InvalidCredentials
      | Core::InvalidCursor(_)
      | Core::Validation(_)) => Self::Rejected(e.to_string()),
      e @ Core::Serialization(_) => Self::Transient(e.to_string()),
    }
  }
}

impl From<folio_core::ValidationError> for Error {
  fn from(err: folio_core::ValidationError) -> Self { Self::Rejected(err.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Convert any backend error into the sync taxonomy via `folio_core::Error`.
pub(crate) fn from_backend<E: Into<folio_core::Error>>(err: E) -> Error {
  Error::from(err.into())
}
