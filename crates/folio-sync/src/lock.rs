use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock `mutex`, recovering the guard if a previous holder panicked.
///
/// Nothing in this crate holds a guard across an `.await`.
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
  match mutex.lock() {
    Ok(guard) => guard,
    Err(poisoned) => {
      warn!(op, result = "poisoned_recovered", "recovered from poisoned lock");
      poisoned.into_inner()
    }
  }
}
