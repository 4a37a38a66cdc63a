//! Principals and the `AuthService` collaborator trait.

use std::{fmt, future::Future, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::Subscription;

/// Identifier of an authenticated account. Assigned at sign-up, never reused.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
  pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for UserId {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(&self.0, f) }
}

impl FromStr for UserId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s)?)) }
}

/// The authenticated identity behind the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub uid:          UserId,
  pub email:        String,
  pub display_name: Option<String>,
}

/// Abstraction over an authentication provider.
///
/// Successful `sign_up` and `sign_in` calls change the session; every
/// registered observer is told about the new principal. `sign_out` clears it.
pub trait AuthService: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// Create an account and sign it in.
  fn sign_up<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
    display_name: Option<&'a str>,
  ) -> impl Future<Output = Result<Principal, Self::Error>> + Send + 'a;

  fn sign_in<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Principal, Self::Error>> + Send + 'a;

  fn sign_out(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Register a session observer.
  ///
  /// The callback runs once immediately with the current principal (or
  /// `None`) and again on every change. Dropping the returned
  /// [`Subscription`] unregisters it.
  fn subscribe<F>(&self, callback: F) -> Subscription
  where
    F: Fn(Option<&Principal>) + Send + Sync + 'static;
}
