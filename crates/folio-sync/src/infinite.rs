//! Cursor-paginated post listing that grows one page at a time.
//!
//! The controller accumulates pages for one [`PostFilter`]. Every page is
//! fetched through the query cache under `posts/list/<filter>/<limit>/<cursor>`, so a
//! list invalidated by a mutation is refetched on the next
//! [`InfinitePostList::refresh`].
//!
//! Each reset bumps a generation counter. A page that arrives for an older
//! generation is dropped, so results of a fetch superseded by
//! [`InfinitePostList::change_filter`] never leak into the new listing.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex},
};

use folio_core::{
  post::{PostId, PostSummary},
  store::{Cursor, Page, PostFilter, PostStore},
};
use tokio::sync::watch;
use tracing::debug;

use crate::{
  access::PostAccess,
  cache::QueryCache,
  error::{Error, Result},
  keys::posts,
  lock::lock,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Published view of an [`InfinitePostList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot {
  pub filter:           PostFilter,
  pub page_size:        usize,
  /// Accumulated posts, newest first, each id at most once.
  pub items:            Vec<PostSummary>,
  pub pages:            usize,
  /// The first page is being fetched.
  pub is_loading:       bool,
  /// A page after the first is being fetched.
  pub is_fetching_next: bool,
  pub has_more:         bool,
  pub last_error:       Option<Error>,
}

struct ListState {
  generation:       u64,
  filter:           PostFilter,
  page_size:        usize,
  items:            Vec<PostSummary>,
  seen:             HashSet<PostId>,
  pages:            usize,
  next_cursor:      Option<Cursor>,
  has_more:         bool,
  is_loading:       bool,
  is_fetching_next: bool,
  last_error:       Option<Error>,
}

impl ListState {
  fn new(filter: PostFilter, page_size: usize) -> Self {
    Self {
      generation: 0,
      filter,
      page_size,
      items: Vec::new(),
      seen: HashSet::new(),
      pages: 0,
      next_cursor: None,
      has_more: true,
      is_loading: false,
      is_fetching_next: false,
      last_error: None,
    }
  }

  fn snapshot(&self) -> ListSnapshot {
    ListSnapshot {
      filter:           self.filter,
      page_size:        self.page_size,
      items:            self.items.clone(),
      pages:            self.pages,
      is_loading:       self.is_loading,
      is_fetching_next: self.is_fetching_next,
      has_more:         self.has_more,
      last_error:       self.last_error.clone(),
    }
  }

  fn append(&mut self, page: &Page) {
    for item in &page.items {
      if self.seen.insert(item.id) {
        self.items.push(item.clone());
      }
    }
    self.pages += 1;
    self.next_cursor = page.next_cursor.clone();
    self.has_more = page.items.len() >= self.page_size && self.next_cursor.is_some();
  }
}

pub struct InfinitePostList<S> {
  cache:  Arc<QueryCache>,
  access: PostAccess<S>,
  state:  Mutex<ListState>,
  tx:     watch::Sender<ListSnapshot>,
}

impl<S: PostStore + 'static> InfinitePostList<S> {
  /// An empty listing of every post. Nothing is fetched until
  /// [`initialize`](Self::initialize).
  pub fn new(cache: Arc<QueryCache>, access: PostAccess<S>) -> Self {
    let state = ListState::new(PostFilter::ALL, DEFAULT_PAGE_SIZE);
    let tx = watch::Sender::new(state.snapshot());
    Self { cache, access, state: Mutex::new(state), tx }
  }

  pub fn snapshot(&self) -> ListSnapshot { self.tx.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<ListSnapshot> { self.tx.subscribe() }

  pub fn filter(&self) -> PostFilter { lock(&self.state, "list.filter").filter }

  pub fn page_size(&self) -> usize { lock(&self.state, "list.page_size").page_size }

  /// Discard accumulated pages and load the first page of `filter`.
  ///
  /// A page size of zero is raised to one.
  pub async fn initialize(&self, filter: PostFilter, page_size: usize) -> Result<()> {
    let generation = {
      let mut state = lock(&self.state, "list.initialize");
      let generation = state.generation + 1;
      *state = ListState::new(filter, page_size.max(1));
      state.generation = generation;
      state.is_loading = true;
      self.tx.send_replace(state.snapshot());
      generation
    };
    debug!(%filter, page_size, generation, "listing reset");

    let outcome = self.fetch(filter, None, page_size.max(1)).await;
    self.apply(generation, outcome)
  }

  /// Load the page after the last accumulated one.
  ///
  /// Returns `Ok(false)` without fetching when the listing is exhausted, has
  /// not been initialized, or already has a fetch in flight.
  pub async fn fetch_next_page(&self) -> Result<bool> {
    let (generation, filter, cursor, page_size) = {
      let mut state = lock(&self.state, "list.fetch_next_page");
      if !state.has_more || state.is_loading || state.is_fetching_next || state.pages == 0 {
        return Ok(false);
      }
      state.is_fetching_next = true;
      self.tx.send_replace(state.snapshot());
      (state.generation, state.filter, state.next_cursor.clone(), state.page_size)
    };

    let outcome = self.fetch(filter, cursor, page_size).await;
    self.apply(generation, outcome)?;
    Ok(true)
  }

  /// Start over with `filter`, keeping the current page size.
  pub async fn change_filter(&self, filter: PostFilter) -> Result<()> {
    let page_size = self.page_size();
    self.initialize(filter, page_size).await
  }

  /// Start over with the current filter and page size.
  pub async fn refresh(&self) -> Result<()> {
    let (filter, page_size) = {
      let state = lock(&self.state, "list.refresh");
      (state.filter, state.page_size)
    };
    self.initialize(filter, page_size).await
  }

  async fn fetch(
    &self,
    filter: PostFilter,
    cursor: Option<Cursor>,
    page_size: usize,
  ) -> Result<Arc<Page>> {
    let key = posts::page(filter, page_size, cursor.as_ref());
    let access = self.access.clone();
    self.cache.get(&key, move || access.page(filter, cursor, page_size)).await
  }

  /// Fold a finished fetch into the state unless the listing was reset
  /// while it was in flight.
  fn apply(&self, generation: u64, outcome: Result<Arc<Page>>) -> Result<()> {
    let mut state = lock(&self.state, "list.apply");
    if state.generation != generation {
      debug!(generation, current = state.generation, "discarding superseded page");
      return Ok(());
    }

    state.is_loading = false;
    state.is_fetching_next = false;
    let result = match outcome {
      Ok(page) => {
        state.append(&page);
        state.last_error = None;
        debug!(
          filter = %state.filter,
          items = state.items.len(),
          pages = state.pages,
          has_more = state.has_more,
          "page applied"
        );
        Ok(())
      }
      Err(err) => {
        state.last_error = Some(err.clone());
        Err(err)
      }
    };
    self.tx.send_replace(state.snapshot());
    result
  }
}
