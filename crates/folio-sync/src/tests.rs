//! Scenario tests for the sync layer against a scripted in-process store and
//! against the SQLite backend.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::{Duration, Utc};
use folio_core::{
  auth::{AuthService, Principal, UserId},
  category::Category,
  post::{NewPost, Post, PostId, PostPatch},
  store::{Cursor, Page, PageQuery, PostFilter, PostStore},
  validate::{PostDraft, PostInput},
};
use tokio::sync::oneshot;

use crate::{
  CacheConfig, Client, EntryStatus, Error, MutationStatus,
  keys::posts,
};

// ─── Scripted store ──────────────────────────────────────────────────────────

/// In-memory `PostStore` that counts calls. Pages are offsets into the
/// newest-first list, and every non-empty page carries a cursor, so only the
/// page length tells the listing it is exhausted.
#[derive(Default)]
struct FakeStore {
  posts:       Mutex<Vec<Post>>,
  page_calls:  AtomicUsize,
  get_calls:   AtomicUsize,
  fail_pages:  AtomicBool,
  /// A page request for a gated filter waits until the sender fires.
  gates:       Mutex<HashMap<PostFilter, oneshot::Receiver<()>>>,
}

impl FakeStore {
  fn page_calls(&self) -> usize { self.page_calls.load(Ordering::SeqCst) }

  fn get_calls(&self) -> usize { self.get_calls.load(Ordering::SeqCst) }

  fn gate(&self, filter: PostFilter) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    self.gates.lock().unwrap().insert(filter, rx);
    tx
  }

  fn seed(&self, author: &Principal, count: usize, category: Option<Category>) {
    let mut posts = self.posts.lock().unwrap();
    for _ in 0..count {
      let post = build_post(author, &format!("seeded {}", posts.len()), category, posts.len());
      posts.insert(0, post);
    }
  }
}

fn build_post(author: &Principal, title: &str, category: Option<Category>, n: usize) -> Post {
  let at = Utc::now() + Duration::microseconds(n as i64);
  Post {
    id:                  PostId::new(),
    title:               title.to_owned(),
    content:             format!("body of {title}"),
    category,
    author_id:           author.uid,
    author_email:        author.email.clone(),
    author_display_name: author.display_name.clone(),
    created_at:          at,
    updated_at:          at,
  }
}

impl PostStore for FakeStore {
  type Error = folio_core::Error;

  async fn page(&self, query: &PageQuery) -> Result<Page, folio_core::Error> {
    self.page_calls.fetch_add(1, Ordering::SeqCst);
    tokio::task::yield_now().await;

    let gate = self.gates.lock().unwrap().remove(&query.filter);
    if let Some(gate) = gate {
      let _ = gate.await;
    }
    if self.fail_pages.load(Ordering::SeqCst) {
      return Err(folio_core::Error::Unavailable("store offline".into()));
    }

    let offset = match &query.cursor {
      Some(cursor) => cursor
        .as_str()
        .parse::<usize>()
        .map_err(|_| folio_core::Error::InvalidCursor(cursor.to_string()))?,
      None => 0,
    };
    let items: Vec<_> = self
      .posts
      .lock()
      .unwrap()
      .iter()
      .filter(|p| query.filter.category.is_none_or(|c| p.category == Some(c)))
      .skip(offset)
      .take(query.limit)
      .map(Post::summary)
      .collect();
    let next_cursor = (!items.is_empty()).then(|| Cursor::new((offset + items.len()).to_string()));
    Ok(Page { items, next_cursor, filter: query.filter })
  }

  async fn get(&self, id: PostId) -> Result<Option<Post>, folio_core::Error> {
    self.get_calls.fetch_add(1, Ordering::SeqCst);
    tokio::task::yield_now().await;
    Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned())
  }

  async fn create(&self, post: NewPost) -> Result<Post, folio_core::Error> {
    let mut posts = self.posts.lock().unwrap();
    let (title, content, category) = post.input.into_parts();
    let mut created = build_post(&post.author, &title, category, posts.len());
    created.content = content;
    posts.insert(0, created.clone());
    Ok(created)
  }

  async fn update(
    &self,
    caller: &Principal,
    id: PostId,
    patch: PostPatch,
  ) -> Result<Post, folio_core::Error> {
    let mut posts = self.posts.lock().unwrap();
    let post = posts
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or(folio_core::Error::PostNotFound(id))?;
    if post.author_id != caller.uid {
      return Err(folio_core::Error::PermissionDenied { post: id, principal: caller.uid });
    }
    if let Some(title) = patch.title {
      post.title = title;
    }
    if let Some(content) = patch.content {
      post.content = content;
    }
    if let Some(category) = patch.category {
      post.category = category;
    }
    post.updated_at = Utc::now() + Duration::seconds(1);
    Ok(post.clone())
  }

  async fn delete(&self, caller: &Principal, id: PostId) -> Result<(), folio_core::Error> {
    let mut posts = self.posts.lock().unwrap();
    let index = posts
      .iter()
      .position(|p| p.id == id)
      .ok_or(folio_core::Error::PostNotFound(id))?;
    if posts[index].author_id != caller.uid {
      return Err(folio_core::Error::PermissionDenied { post: id, principal: caller.uid });
    }
    posts.remove(index);
    Ok(())
  }
}

fn principal(email: &str) -> Principal {
  Principal { uid: UserId::new(), email: email.into(), display_name: None }
}

fn input(title: &str, category: Option<Category>) -> PostInput {
  PostDraft::new(title, "some content", category).validate().unwrap()
}

fn fake() -> (Arc<FakeStore>, Client<FakeStore>) {
  let store = Arc::new(FakeStore::default());
  let client = Client::new(store.clone(), CacheConfig::default());
  (store, client)
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_stops_after_the_short_page() {
  let (store, client) = fake();
  store.seed(&principal("a@example.com"), 25, None);
  let list = client.infinite_posts();

  list.initialize(PostFilter::ALL, 10).await.unwrap();
  assert!(list.snapshot().has_more);
  assert!(list.fetch_next_page().await.unwrap());
  assert!(list.snapshot().has_more);
  assert!(list.fetch_next_page().await.unwrap());

  let snapshot = list.snapshot();
  assert_eq!(snapshot.items.len(), 25);
  assert_eq!(snapshot.pages, 3);
  assert!(!snapshot.has_more);
  assert_eq!(store.page_calls(), 3);

  assert!(!list.fetch_next_page().await.unwrap());
  assert_eq!(store.page_calls(), 3);
}

#[tokio::test]
async fn items_arrive_newest_first_without_duplicates() {
  let (store, client) = fake();
  store.seed(&principal("a@example.com"), 12, None);
  let list = client.infinite_posts();

  list.initialize(PostFilter::ALL, 5).await.unwrap();
  while list.fetch_next_page().await.unwrap() {}

  let snapshot = list.snapshot();
  assert_eq!(snapshot.items.len(), 12);
  assert!(snapshot.items.windows(2).all(|w| w[0].created_at >= w[1].created_at));
  let mut ids: Vec<_> = snapshot.items.iter().map(|p| p.id).collect();
  ids.sort();
  ids.dedup();
  assert_eq!(ids.len(), 12);
}

#[tokio::test]
async fn next_page_is_a_no_op_before_initialize() {
  let (store, client) = fake();
  store.seed(&principal("a@example.com"), 3, None);
  let list = client.infinite_posts();

  assert!(!list.fetch_next_page().await.unwrap());
  assert_eq!(store.page_calls(), 0);
}

#[tokio::test]
async fn concurrent_next_page_requests_issue_one_fetch() {
  let (store, client) = fake();
  store.seed(&principal("a@example.com"), 30, None);
  let list = client.infinite_posts();
  list.initialize(PostFilter::ALL, 10).await.unwrap();

  let (a, b) = tokio::join!(list.fetch_next_page(), list.fetch_next_page());
  assert!(a.unwrap() ^ b.unwrap());
  assert_eq!(store.page_calls(), 2);
  assert_eq!(list.snapshot().items.len(), 20);
}

#[tokio::test]
async fn change_filter_keeps_only_the_new_first_page() {
  let (store, client) = fake();
  let author = principal("a@example.com");
  store.seed(&author, 15, Some(Category::React));
  store.seed(&author, 15, Some(Category::Firebase));
  let list = client.infinite_posts();

  list.initialize(PostFilter::ALL, 10).await.unwrap();
  list.fetch_next_page().await.unwrap();
  assert_eq!(list.snapshot().items.len(), 20);

  list.change_filter(PostFilter::category(Category::React)).await.unwrap();
  let snapshot = list.snapshot();
  assert_eq!(snapshot.filter, PostFilter::category(Category::React));
  assert_eq!(snapshot.page_size, 10);
  assert_eq!(snapshot.pages, 1);
  assert_eq!(snapshot.items.len(), 10);
  assert!(snapshot.items.iter().all(|p| p.category == Some(Category::React)));
}

#[tokio::test]
async fn page_superseded_by_a_filter_change_is_discarded() {
  let (store, client) = fake();
  let author = principal("a@example.com");
  store.seed(&author, 5, Some(Category::React));
  store.seed(&author, 5, None);
  let release = store.gate(PostFilter::ALL);
  let list = client.infinite_posts();

  let (stale, fresh) = tokio::join!(list.initialize(PostFilter::ALL, 10), async {
    tokio::task::yield_now().await;
    let outcome = list.change_filter(PostFilter::category(Category::React)).await;
    let _ = release.send(());
    outcome
  });
  stale.unwrap();
  fresh.unwrap();

  let snapshot = list.snapshot();
  assert_eq!(snapshot.filter, PostFilter::category(Category::React));
  assert_eq!(snapshot.items.len(), 5);
  assert!(snapshot.items.iter().all(|p| p.category == Some(Category::React)));
  assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn lists_sharing_a_cache_share_fetches() {
  let (store, client) = fake();
  store.seed(&principal("a@example.com"), 4, None);
  let first = client.infinite_posts();
  let second = client.infinite_posts();

  let (a, b) = tokio::join!(
    first.initialize(PostFilter::ALL, 10),
    second.initialize(PostFilter::ALL, 10)
  );
  a.unwrap();
  b.unwrap();

  assert_eq!(store.page_calls(), 1);
  assert_eq!(first.snapshot().items, second.snapshot().items);
}

#[tokio::test]
async fn lists_with_different_page_sizes_do_not_share_pages() {
  let (store, client) = fake();
  store.seed(&principal("a@example.com"), 40, None);
  let small = client.infinite_posts();
  let large = client.infinite_posts();

  small.initialize(PostFilter::ALL, 5).await.unwrap();
  large.initialize(PostFilter::ALL, 20).await.unwrap();

  let snapshot = large.snapshot();
  assert_eq!(snapshot.items.len(), 20);
  assert!(snapshot.has_more);
  assert_eq!(store.page_calls(), 2);

  assert!(large.fetch_next_page().await.unwrap());
  assert_eq!(large.snapshot().items.len(), 40);
  assert_eq!(small.snapshot().items.len(), 5);
  assert!(small.snapshot().has_more);
}

#[tokio::test]
async fn failed_first_page_is_reported_and_retried() {
  let (store, client) = fake();
  store.seed(&principal("a@example.com"), 3, None);
  store.fail_pages.store(true, Ordering::SeqCst);
  let list = client.infinite_posts();

  let err = list.initialize(PostFilter::ALL, 10).await.unwrap_err();
  assert!(err.is_retryable());
  let snapshot = list.snapshot();
  assert_eq!(snapshot.last_error, Some(err));
  assert!(!snapshot.is_loading);
  assert!(!list.fetch_next_page().await.unwrap());

  store.fail_pages.store(false, Ordering::SeqCst);
  list.refresh().await.unwrap();
  let snapshot = list.snapshot();
  assert_eq!(snapshot.items.len(), 3);
  assert_eq!(snapshot.last_error, None);
  assert_eq!(store.page_calls(), 2);
}

// ─── Mutations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_invalidates_cached_lists() {
  let (store, client) = fake();
  let author = principal("a@example.com");
  store.seed(&author, 2, None);
  let list = client.infinite_posts();

  list.initialize(PostFilter::ALL, 10).await.unwrap();
  list.refresh().await.unwrap();
  assert_eq!(store.page_calls(), 1, "second read is a cache hit");

  let create = client.create_post();
  let id = create.mutate(input("Fresh", None), &author).await.unwrap();
  assert_eq!(create.state().status(), MutationStatus::Success(id));
  assert_eq!(
    client.cache().status(&posts::page(PostFilter::ALL, 10, None)),
    Some(EntryStatus::Stale)
  );

  list.refresh().await.unwrap();
  assert_eq!(store.page_calls(), 2);
  assert_eq!(list.snapshot().items[0].id, id);
}

#[tokio::test]
async fn update_by_a_stranger_changes_nothing() {
  let (store, client) = fake();
  let alice = principal("alice@example.com");
  let mallory = principal("mallory@example.com");
  store.seed(&alice, 1, None);
  let list = client.infinite_posts();
  list.initialize(PostFilter::ALL, 10).await.unwrap();
  let id = list.snapshot().items[0].id;
  let before = client.post(id).await.unwrap().unwrap();

  let update = client.update_post();
  let err = update.mutate(&mallory, id, input("Hijacked", None)).await.unwrap_err();
  assert!(matches!(err, Error::PermissionDenied(_)));
  assert_eq!(update.state().status(), MutationStatus::Error(err));

  let cache = client.cache();
  assert_eq!(cache.status(&posts::detail(id)), Some(EntryStatus::Fresh));
  assert_eq!(cache.status(&posts::page(PostFilter::ALL, 10, None)), Some(EntryStatus::Fresh));
  assert_eq!(client.post(id).await.unwrap().unwrap(), before);
  assert_eq!(store.get_calls(), 1);

  update.reset();
  assert!(update.state().status().is_idle());
}

#[tokio::test]
async fn update_refreshes_detail_and_lists() {
  let (store, client) = fake();
  let alice = principal("alice@example.com");
  let id = client.create_post().mutate(input("Draft", None), &alice).await.unwrap();
  client.post(id).await.unwrap();

  let updated_at = client
    .update_post()
    .mutate(&alice, id, input("Final", Some(Category::Typescript)))
    .await
    .unwrap();
  assert_eq!(client.cache().status(&posts::detail(id)), Some(EntryStatus::Stale));

  let post = client.post(id).await.unwrap().unwrap();
  assert_eq!(post.title, "Final");
  assert_eq!(post.category, Some(Category::Typescript));
  assert_eq!(post.updated_at, updated_at);
  assert!(post.is_edited());
  assert_eq!(store.get_calls(), 2);
}

#[tokio::test]
async fn delete_removes_post_from_detail_and_lists() {
  let (_store, client) = fake();
  let alice = principal("alice@example.com");
  let id = client.create_post().mutate(input("Doomed", None), &alice).await.unwrap();
  let list = client.infinite_posts();
  list.initialize(PostFilter::ALL, 10).await.unwrap();
  assert!(client.post(id).await.unwrap().is_some());

  client.delete_post().mutate(&alice, id).await.unwrap();

  assert_eq!(client.post(id).await.unwrap(), None);
  list.refresh().await.unwrap();
  assert!(list.snapshot().items.is_empty());
}

#[tokio::test]
async fn deleting_a_missing_post_is_not_found() {
  let (_store, client) = fake();
  let alice = principal("alice@example.com");
  let missing = PostId::new();

  let delete = client.delete_post();
  let err = delete.mutate(&alice, missing).await.unwrap_err();
  assert_eq!(err, Error::NotFound(missing));
  assert!(!err.is_retryable());
  assert_eq!(delete.state().status().error(), Some(&err));
}

#[tokio::test]
async fn missing_detail_is_none_and_cached() {
  let (store, client) = fake();
  let id = PostId::new();

  assert_eq!(client.post(id).await.unwrap(), None);
  assert_eq!(client.post(id).await.unwrap(), None);
  assert_eq!(store.get_calls(), 1);
}

#[tokio::test]
async fn mutation_status_moves_through_pending() {
  let (_store, client) = fake();
  let alice = principal("alice@example.com");
  let create = client.create_post();
  let mut status = create.state().subscribe();
  assert!(status.borrow().is_idle());

  let id = create.mutate(input("Watched", None), &alice).await.unwrap();
  assert!(status.has_changed().unwrap());
  assert_eq!(status.borrow_and_update().data(), Some(&id));
  assert!(!create.state().is_pending());
}

// ─── SQLite backend ──────────────────────────────────────────────────────────

#[tokio::test]
async fn created_post_leads_the_sqlite_listing() {
  let (store, auth) = folio_store_sqlite::open_in_memory().await.unwrap();
  let client = Client::new(Arc::new(store), CacheConfig::default());
  let alice = auth.sign_up("alice@example.com", "hunter22", Some("Alice")).await.unwrap();

  let create = client.create_post();
  for title in ["one", "two", "three"] {
    create.mutate(input(title, Some(Category::React)), &alice).await.unwrap();
  }
  let list = client.infinite_posts();
  list.initialize(PostFilter::ALL, 2).await.unwrap();

  let id = create.mutate(input("newest", None), &alice).await.unwrap();
  list.refresh().await.unwrap();

  let snapshot = list.snapshot();
  assert_eq!(snapshot.items[0].id, id);
  assert_eq!(snapshot.items[0].author_id, alice.uid);
  assert_eq!(snapshot.items[0].author_name(), "Alice");

  list.fetch_next_page().await.unwrap();
  list.fetch_next_page().await.unwrap();
  let snapshot = list.snapshot();
  assert_eq!(snapshot.items.len(), 4);
  assert!(!snapshot.has_more);
}

#[tokio::test]
async fn sqlite_rejects_updates_from_other_accounts() {
  let (store, auth) = folio_store_sqlite::open_in_memory().await.unwrap();
  let client = Client::new(Arc::new(store), CacheConfig::default());
  let alice = auth.sign_up("alice@example.com", "hunter22", None).await.unwrap();
  let bob = auth.sign_up("bob@example.com", "hunter22", None).await.unwrap();

  let id = client.create_post().mutate(input("Mine", None), &alice).await.unwrap();
  let err = client
    .update_post()
    .mutate(&bob, id, input("Yours now", None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PermissionDenied(_)));

  let post = client.post(id).await.unwrap().unwrap();
  assert_eq!(post.title, "Mine");
  assert!(!post.is_edited());
}
