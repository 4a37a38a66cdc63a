//! Session observer registry shared by authentication backends.
//!
//! A [`SessionHub`] owns the current principal and the list of observers.
//! Registration hands back a [`Subscription`] guard; dropping the guard
//! unregisters the observer, so a torn-down view never receives a callback.

use std::{
  collections::BTreeMap,
  sync::{Arc, Mutex, MutexGuard, Weak},
};

use tracing::warn;

use crate::auth::Principal;

type Observer = Arc<dyn Fn(Option<&Principal>) + Send + Sync>;

#[derive(Default)]
struct HubState {
  current:   Option<Principal>,
  next_id:   u64,
  observers: BTreeMap<u64, Observer>,
}

/// Holds the current principal and notifies observers when it changes.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct SessionHub {
  state: Arc<Mutex<HubState>>,
}

impl SessionHub {
  pub fn new() -> Self { Self::default() }

  pub fn current(&self) -> Option<Principal> { lock(&self.state).current.clone() }

  /// Replace the current principal and notify every observer.
  ///
  /// Observers run outside the registry lock, so a callback may itself
  /// subscribe or drop a subscription.
  pub fn set(&self, principal: Option<Principal>) {
    let observers: Vec<Observer> = {
      let mut state = lock(&self.state);
      state.current = principal.clone();
      state.observers.values().cloned().collect()
    };
    for observer in observers {
      observer(principal.as_ref());
    }
  }

  /// Register `callback`; it is invoked immediately with the current value.
  pub fn subscribe<F>(&self, callback: F) -> Subscription
  where
    F: Fn(Option<&Principal>) + Send + Sync + 'static,
  {
    let observer: Observer = Arc::new(callback);
    let (id, current) = {
      let mut state = lock(&self.state);
      let id = state.next_id;
      state.next_id += 1;
      state.observers.insert(id, Arc::clone(&observer));
      (id, state.current.clone())
    };
    observer(current.as_ref());
    Subscription { hub: Arc::downgrade(&self.state), id }
  }

  pub fn observer_count(&self) -> usize { lock(&self.state).observers.len() }
}

/// Guard returned by [`SessionHub::subscribe`]. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
  hub: Weak<Mutex<HubState>>,
  id:  u64,
}

impl Subscription {
  /// Explicitly release the registration. Equivalent to dropping the guard.
  pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(state) = self.hub.upgrade() {
      lock(&state).observers.remove(&self.id);
    }
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription").field("id", &self.id).finish()
  }
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
  match state.lock() {
    Ok(guard) => guard,
    Err(poisoned) => {
      warn!(op = "session_hub", result = "poisoned_recovered", "recovered from poisoned lock");
      poisoned.into_inner()
    }
  }
}
