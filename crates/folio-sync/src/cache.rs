//! Keyed query cache with in-flight de-duplication.
//!
//! Values are stored type-erased behind an `Arc`, so a reader keeps its copy
//! after the entry is evicted or replaced. Concurrent [`QueryCache::get`]
//! calls for a key that is already being fetched attach to the running fetch
//! instead of starting another one.
//!
//! Every fetch carries a ticket. [`QueryCache::invalidate`],
//! [`QueryCache::set`] and [`QueryCache::remove`] retire the tickets of
//! fetches under the affected keys, so a result that raced a write is handed
//! to its waiters but never committed.

use std::{
  any::Any,
  collections::HashMap,
  future::Future,
  num::NonZeroUsize,
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use futures::{
  FutureExt,
  future::{BoxFuture, Shared},
};
use lru::LruCache;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::{
  error::{Error, Result},
  keys::QueryKey,
  lock::lock,
};

type Value = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;

const EVENT_BUFFER: usize = 256;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
  /// Entries kept before the least recently used one is evicted.
  pub capacity:    NonZeroUsize,
  /// Age after which an entry is refetched on the next read. `None` keeps
  /// entries fresh until they are invalidated.
  pub stale_after: Option<Duration>,
}

impl CacheConfig {
  pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(255);

  /// A capacity of zero is raised to one.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
      ..Self::default()
    }
  }

  pub fn stale_after(mut self, age: Duration) -> Self {
    self.stale_after = Some(age);
    self
  }
}

impl Default for CacheConfig {
  fn default() -> Self { Self { capacity: Self::DEFAULT_CAPACITY, stale_after: None } }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Change notification published by a [`QueryCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
  /// A fetch result or an explicit `set` was committed under the key.
  Stored(QueryKey),
  /// The entry was marked stale and will be refetched on the next read.
  Invalidated(QueryKey),
  /// The entry was dropped to make room.
  Evicted(QueryKey),
  Removed(QueryKey),
}

impl CacheEvent {
  pub fn key(&self) -> &QueryKey {
    match self {
      Self::Stored(key) | Self::Invalidated(key) | Self::Evicted(key) | Self::Removed(key) => {
        key
      }
    }
  }
}

/// Freshness of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  Fresh,
  Stale,
}

// ─── Cache ───────────────────────────────────────────────────────────────────

struct Entry {
  value:     Value,
  stored_at: Instant,
  stale:     bool,
}

struct InFlight {
  ticket: u64,
  fetch:  SharedFetch,
}

struct State {
  entries:     LruCache<QueryKey, Entry>,
  in_flight:   HashMap<QueryKey, InFlight>,
  next_ticket: u64,
}

pub struct QueryCache {
  state:  Mutex<State>,
  config: CacheConfig,
  events: broadcast::Sender<CacheEvent>,
}

impl Default for QueryCache {
  fn default() -> Self { Self::new(CacheConfig::default()) }
}

impl QueryCache {
  pub fn new(config: CacheConfig) -> Self {
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    Self {
      state: Mutex::new(State {
        entries:     LruCache::new(config.capacity),
        in_flight:   HashMap::new(),
        next_ticket: 0,
      }),
      config,
      events,
    }
  }

  pub fn config(&self) -> &CacheConfig { &self.config }

  /// Receive a [`CacheEvent`] for every subsequent change.
  pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> { self.events.subscribe() }

  /// Return the cached value for `key`, fetching it on a miss.
  ///
  /// A fresh entry is returned without calling `fetch`. A stale or missing
  /// entry is fetched once no matter how many callers ask concurrently; every
  /// caller receives the same outcome. Failures are returned to the waiters
  /// and never cached.
  ///
  /// `fetch` is called while the cache is locked and must only build the
  /// future, not touch the cache.
  pub async fn get<T, F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<Arc<T>>
  where
    T: Any + Send + Sync,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let (ticket, shared) = {
      let mut guard = lock(&self.state, "cache.get");
      let state = &mut *guard;
      if let Some(entry) = state.entries.get(key) {
        if self.is_fresh(entry) {
          trace!(%key, "cache hit");
          return downcast(key, entry.value.clone());
        }
      }

      match state.in_flight.get(key) {
        Some(running) => {
          trace!(%key, "joining in-flight fetch");
          (running.ticket, running.fetch.clone())
        }
        None => {
          let ticket = state.next_ticket;
          state.next_ticket += 1;
          let pending = fetch();
          let shared = async move { pending.await.map(|v| Arc::new(v) as Value) }
            .boxed()
            .shared();
          state.in_flight.insert(key.clone(), InFlight { ticket, fetch: shared.clone() });
          debug!(%key, ticket, "fetch started");
          (ticket, shared)
        }
      }
    };

    let outcome = shared.await;
    self.settle(key, ticket, &outcome);
    downcast(key, outcome?)
  }

  /// Commit a finished fetch if its ticket is still the current one.
  fn settle(&self, key: &QueryKey, ticket: u64, outcome: &Result<Value>) {
    let mut events = Vec::new();
    {
      let mut state = lock(&self.state, "cache.settle");
      // Another waiter already settled it, or a write retired the ticket.
      if state.in_flight.get(key).map(|running| running.ticket) != Some(ticket) {
        return;
      }
      state.in_flight.remove(key);

      match outcome {
        Ok(value) => {
          let entry = Entry { value: value.clone(), stored_at: Instant::now(), stale: false };
          if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
            if &evicted != key {
              events.push(CacheEvent::Evicted(evicted));
            }
          }
          events.push(CacheEvent::Stored(key.clone()));
          debug!(%key, ticket, "fetch committed");
        }
        Err(err) => warn!(%key, ticket, error = %err, "fetch failed"),
      }
    }
    self.publish(events);
  }

  /// Mark every entry under `prefix` stale and retire in-flight fetches
  /// under it. Returns the number of entries marked.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let events: Vec<CacheEvent> = {
      let mut state = lock(&self.state, "cache.invalidate");
      state.in_flight.retain(|key, _| !key.starts_with(prefix));
      let marked = state
        .entries
        .iter_mut()
        .filter(|(key, _)| key.starts_with(prefix))
        .map(|(key, entry)| {
          entry.stale = true;
          CacheEvent::Invalidated(key.clone())
        })
        .collect();
      marked
    };
    debug!(%prefix, entries = events.len(), "invalidated");
    let marked = events.len();
    self.publish(events);
    marked
  }

  /// Read an entry without fetching, whether fresh or stale. Does not affect
  /// eviction order.
  pub fn peek<T: Any + Send + Sync>(&self, key: &QueryKey) -> Result<Option<Arc<T>>> {
    let value = lock(&self.state, "cache.peek").entries.peek(key).map(|e| e.value.clone());
    value.map(|v| downcast(key, v)).transpose()
  }

  /// Store `value` as a fresh entry, superseding any running fetch.
  pub fn set<T: Any + Send + Sync>(&self, key: &QueryKey, value: T) -> Arc<T> {
    let value = Arc::new(value);
    let mut events = Vec::new();
    {
      let mut state = lock(&self.state, "cache.set");
      state.in_flight.remove(key);
      let entry =
        Entry { value: value.clone() as Value, stored_at: Instant::now(), stale: false };
      if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
        if &evicted != key {
          events.push(CacheEvent::Evicted(evicted));
        }
      }
      events.push(CacheEvent::Stored(key.clone()));
    }
    self.publish(events);
    value
  }

  /// Drop every entry under `prefix` along with running fetches. Returns the
  /// number of entries dropped.
  pub fn remove(&self, prefix: &QueryKey) -> usize {
    let events: Vec<CacheEvent> = {
      let mut state = lock(&self.state, "cache.remove");
      state.in_flight.retain(|key, _| !key.starts_with(prefix));
      let doomed: Vec<QueryKey> = state
        .entries
        .iter()
        .filter(|(key, _)| key.starts_with(prefix))
        .map(|(key, _)| key.clone())
        .collect();
      for key in &doomed {
        state.entries.pop(key);
      }
      doomed.into_iter().map(CacheEvent::Removed).collect()
    };
    let removed = events.len();
    self.publish(events);
    removed
  }

  pub fn status(&self, key: &QueryKey) -> Option<EntryStatus> {
    let state = lock(&self.state, "cache.status");
    state.entries.peek(key).map(|entry| {
      if self.is_fresh(entry) { EntryStatus::Fresh } else { EntryStatus::Stale }
    })
  }

  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    lock(&self.state, "cache.is_fetching").in_flight.contains_key(key)
  }

  pub fn len(&self) -> usize { lock(&self.state, "cache.len").entries.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn is_fresh(&self, entry: &Entry) -> bool {
    !entry.stale && self.config.stale_after.is_none_or(|age| entry.stored_at.elapsed() < age)
  }

  fn publish(&self, events: Vec<CacheEvent>) {
    for event in events {
      // No receivers is fine.
      let _ = self.events.send(event);
    }
  }
}

fn downcast<T: Any + Send + Sync>(key: &QueryKey, value: Value) -> Result<Arc<T>> {
  value.downcast::<T>().map_err(|_| Error::TypeMismatch(key.to_string()))
}
