//! Mirror of the authentication session.

use std::sync::Arc;

use folio_core::{
  auth::{AuthService, Principal},
  session::Subscription,
};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
  /// No callback has arrived from the auth service yet.
  Resolving,
  SignedOut,
  SignedIn(Principal),
}

impl SessionState {
  pub fn principal(&self) -> Option<&Principal> {
    match self {
      Self::SignedIn(principal) => Some(principal),
      _ => None,
    }
  }

  pub fn is_resolved(&self) -> bool { !matches!(self, Self::Resolving) }
}

/// Holds the current principal as reported by an [`AuthService`].
///
/// The session is only ever changed by the service's callback. Dropping the
/// `Session` releases the registration.
pub struct Session {
  tx:            Arc<watch::Sender<SessionState>>,
  _subscription: Subscription,
}

impl Session {
  pub fn attach<A: AuthService>(auth: &A) -> Self {
    let tx = Arc::new(watch::Sender::new(SessionState::Resolving));
    let observer = Arc::clone(&tx);
    let subscription = auth.subscribe(move |principal| {
      let next = match principal {
        Some(p) => SessionState::SignedIn(p.clone()),
        None => SessionState::SignedOut,
      };
      debug!(signed_in = principal.is_some(), "session changed");
      observer.send_replace(next);
    });
    Self { tx, _subscription: subscription }
  }

  pub fn state(&self) -> SessionState { self.tx.borrow().clone() }

  pub fn current(&self) -> Option<Principal> { self.tx.borrow().principal().cloned() }

  pub fn is_resolved(&self) -> bool { self.tx.borrow().is_resolved() }

  /// The current principal, or [`Error::Unauthenticated`].
  pub fn require(&self) -> Result<Principal> { self.current().ok_or(Error::Unauthenticated) }

  pub fn subscribe(&self) -> watch::Receiver<SessionState> { self.tx.subscribe() }
}

#[cfg(test)]
mod tests {
  use folio_core::{auth::UserId, session::SessionHub};

  use super::*;

  /// Auth service that signs anyone in without checking anything.
  #[derive(Default)]
  struct OpenDoor {
    hub: SessionHub,
  }

  impl AuthService for OpenDoor {
    type Error = folio_core::Error;

    async fn sign_up(
      &self,
      email: &str,
      password: &str,
      display_name: Option<&str>,
    ) -> Result<Principal, folio_core::Error> {
      let _ = (password, display_name);
      let principal =
        Principal { uid: UserId::new(), email: email.to_owned(), display_name: None };
      self.hub.set(Some(principal.clone()));
      Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, folio_core::Error> {
      self.sign_up(email, password, None).await
    }

    async fn sign_out(&self) -> Result<(), folio_core::Error> {
      self.hub.set(None);
      Ok(())
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
      F: Fn(Option<&Principal>) + Send + Sync + 'static,
    {
      self.hub.subscribe(callback)
    }
  }

  #[tokio::test]
  async fn attach_resolves_immediately() {
    let auth = OpenDoor::default();
    let session = Session::attach(&auth);
    assert!(session.is_resolved());
    assert_eq!(session.state(), SessionState::SignedOut);
    assert_eq!(session.require(), Err(Error::Unauthenticated));
  }

  #[tokio::test]
  async fn session_follows_sign_in_and_out() {
    let auth = OpenDoor::default();
    let session = Session::attach(&auth);
    let mut changes = session.subscribe();

    let principal = auth.sign_in("dana@example.com", "secret").await.unwrap();
    assert!(changes.has_changed().unwrap());
    assert_eq!(*changes.borrow_and_update(), SessionState::SignedIn(principal.clone()));
    assert_eq!(session.require().unwrap(), principal);

    auth.sign_out().await.unwrap();
    assert_eq!(session.current(), None);
  }

  #[tokio::test]
  async fn dropping_the_session_releases_the_observer() {
    let auth = OpenDoor::default();
    let session = Session::attach(&auth);
    assert_eq!(auth.hub.observer_count(), 1);
    drop(session);
    assert_eq!(auth.hub.observer_count(), 0);
  }
}
