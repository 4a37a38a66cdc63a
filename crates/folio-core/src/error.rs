//! Error types for `folio-core`.

use thiserror::Error;

use crate::{auth::UserId, post::PostId, validate::ValidationError};

/// Failures reported by a [`PostStore`](crate::store::PostStore) or an
/// [`AuthService`](crate::auth::AuthService).
#[derive(Debug, Error)]
pub enum Error {
  #[error("post not found: {0}")]
  PostNotFound(PostId),

  #[error("user {principal} may not modify post {post}")]
  PermissionDenied { post: PostId, principal: UserId },

  #[error("not signed in")]
  Unauthenticated,

  #[error("email address is already in use")]
  EmailInUse,

  #[error("email address is malformed")]
  InvalidEmail,

  #[error("password is too weak")]
  WeakPassword,

  #[error("email or password is incorrect")]
  InvalidCredentials,

  #[error("invalid page cursor: {0}")]
  InvalidCursor(String),

  /// Network, timeout or service failure. The caller may re-trigger the
  /// action; nothing retries automatically.
  #[error("backend unavailable: {0}")]
  Unavailable(String),

  #[error("invalid input: {0}")]
  Validation(#[from] ValidationError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Unavailable(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
