//! Write controllers for posts.
//!
//! Each controller issues exactly one store write per call, never retries,
//! and on success invalidates the cache regions the write made stale. A
//! failed write invalidates nothing. Progress is published on a `watch`
//! channel as a [`MutationStatus`].

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use folio_core::{auth::Principal, post::PostId, store::PostStore, validate::PostInput};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{access::PostAccess, cache::QueryCache, error::Result, keys::posts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationStatus<T> {
  Idle,
  Pending,
  Success(T),
  Error(crate::Error),
}

impl<T> MutationStatus<T> {
  pub fn is_idle(&self) -> bool { matches!(self, Self::Idle) }

  pub fn is_pending(&self) -> bool { matches!(self, Self::Pending) }

  pub fn data(&self) -> Option<&T> {
    match self {
      Self::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&crate::Error> {
    match self {
      Self::Error(err) => Some(err),
      _ => None,
    }
  }
}

/// Observable status of one mutation controller.
pub struct MutationState<T> {
  tx: watch::Sender<MutationStatus<T>>,
}

impl<T: Clone> MutationState<T> {
  fn new() -> Self { Self { tx: watch::Sender::new(MutationStatus::Idle) } }

  pub fn status(&self) -> MutationStatus<T> { self.tx.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<MutationStatus<T>> { self.tx.subscribe() }

  pub fn is_pending(&self) -> bool { self.tx.borrow().is_pending() }

  /// Return to `Idle`, dropping the last result or error.
  pub fn reset(&self) { self.tx.send_replace(MutationStatus::Idle); }

  /// Drive `write` through `Pending` to `Success` or `Error`. `on_success`
  /// runs before observers see `Success`. If the returned future is dropped
  /// before `write` finishes, the status falls back to `Idle`.
  async fn run(
    &self,
    op: &'static str,
    write: impl Future<Output = Result<T>>,
    on_success: impl FnOnce(&T),
  ) -> Result<T> {
    self.tx.send_replace(MutationStatus::Pending);
    let pending = PendingGuard { op, tx: &self.tx };
    let outcome = write.await;
    pending.settle();
    match outcome {
      Ok(data) => {
        on_success(&data);
        self.tx.send_replace(MutationStatus::Success(data.clone()));
        Ok(data)
      }
      Err(err) => {
        warn!(op, error = %err, "mutation failed");
        self.tx.send_replace(MutationStatus::Error(err.clone()));
        Err(err)
      }
    }
  }
}

/// Resets a `Pending` status to `Idle` when the write is abandoned.
struct PendingGuard<'a, T> {
  op: &'static str,
  tx: &'a watch::Sender<MutationStatus<T>>,
}

impl<T> PendingGuard<'_, T> {
  fn settle(self) { std::mem::forget(self) }
}

impl<T> Drop for PendingGuard<'_, T> {
  fn drop(&mut self) {
    debug!(op = self.op, "mutation abandoned while pending");
    self.tx.send_if_modified(|status| {
      let pending = status.is_pending();
      if pending {
        *status = MutationStatus::Idle;
      }
      pending
    });
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

pub struct CreatePost<S> {
  cache:  Arc<QueryCache>,
  access: PostAccess<S>,
  state:  MutationState<PostId>,
}

impl<S: PostStore + 'static> CreatePost<S> {
  pub fn new(cache: Arc<QueryCache>, access: PostAccess<S>) -> Self {
    Self { cache, access, state: MutationState::new() }
  }

  pub fn state(&self) -> &MutationState<PostId> { &self.state }

  pub fn reset(&self) { self.state.reset() }

  /// Create a post authored by `author` and return its id.
  pub async fn mutate(&self, input: PostInput, author: &Principal) -> Result<PostId> {
    let write = async { self.access.create(input, author).await.map(|post| post.id) };
    self
      .state
      .run("create", write, |id| {
        self.cache.invalidate(&posts::lists());
        info!(%id, author = %author.uid, "post created");
      })
      .await
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

pub struct UpdatePost<S> {
  cache:  Arc<QueryCache>,
  access: PostAccess<S>,
  state:  MutationState<DateTime<Utc>>,
}

impl<S: PostStore + 'static> UpdatePost<S> {
  pub fn new(cache: Arc<QueryCache>, access: PostAccess<S>) -> Self {
    Self { cache, access, state: MutationState::new() }
  }

  pub fn state(&self) -> &MutationState<DateTime<Utc>> { &self.state }

  pub fn reset(&self) { self.state.reset() }

  /// Replace the post's title, content and category. Returns the new
  /// `updated_at`.
  pub async fn mutate(
    &self,
    caller: &Principal,
    id: PostId,
    input: PostInput,
  ) -> Result<DateTime<Utc>> {
    self
      .state
      .run("update", self.access.update(caller, id, input), |_| {
        self.cache.invalidate(&posts::lists());
        self.cache.invalidate(&posts::detail(id));
        info!(%id, "post updated");
      })
      .await
  }
}

// ─── Delete ──────────────────────────────────────────────────────────────────

pub struct DeletePost<S> {
  cache:  Arc<QueryCache>,
  access: PostAccess<S>,
  state:  MutationState<()>,
}

impl<S: PostStore + 'static> DeletePost<S> {
  pub fn new(cache: Arc<QueryCache>, access: PostAccess<S>) -> Self {
    Self { cache, access, state: MutationState::new() }
  }

  pub fn state(&self) -> &MutationState<()> { &self.state }

  pub fn reset(&self) { self.state.reset() }

  pub async fn mutate(&self, caller: &Principal, id: PostId) -> Result<()> {
    self
      .state
      .run("delete", self.access.delete(caller, id), |_| {
        self.cache.invalidate(&posts::lists());
        self.cache.invalidate(&posts::detail(id));
        info!(%id, "post deleted");
      })
      .await
  }
}
