//! The `PostStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `folio-store-sqlite`).
//! The sync layer depends on this abstraction, not on any concrete backend.

use std::{fmt, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
  auth::Principal,
  category::Category,
  post::{NewPost, Post, PostId, PostPatch, PostSummary},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostFilter {
  /// Equality filter on category; `None` lists every post.
  pub category: Option<Category>,
}

impl PostFilter {
  pub const ALL: Self = Self { category: None };

  pub fn category(category: Category) -> Self { Self { category: Some(category) } }
}

impl From<Option<Category>> for PostFilter {
  fn from(category: Option<Category>) -> Self { Self { category } }
}

impl fmt::Display for PostFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.category {
      Some(c) => f.write_str(c.as_str()),
      None => f.write_str("all"),
    }
  }
}

/// Opaque continuation token marking the position after the last item of a
/// page. Only meaningful to the store that issued it, and only together with
/// the filter it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
  pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Cursor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Parameters for [`PostStore::page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
  pub filter: PostFilter,
  /// Start after this position; `None` starts at the newest post.
  pub cursor: Option<Cursor>,
  pub limit:  usize,
}

/// One batch of a listing, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  pub items:       Vec<PostSummary>,
  /// Continuation for the next page; `None` when the listing is exhausted.
  pub next_cursor: Option<Cursor>,
  pub filter:      PostFilter,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the `posts` collection of a document store.
///
/// The store is the authority on ownership: `update` and `delete` must refuse
/// callers other than the post's author with
/// [`Error::PermissionDenied`](crate::Error::PermissionDenied).
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait PostStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// List posts ordered by `created_at` descending.
  fn page<'a>(
    &'a self,
    query: &'a PageQuery,
  ) -> impl Future<Output = Result<Page, Self::Error>> + Send + 'a;

  /// Retrieve a post by id. Returns `None` if not found.
  fn get(
    &self,
    id: PostId,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Persist a new post. Id, `created_at` and `updated_at` are set by the
  /// store.
  fn create(
    &self,
    post: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  /// Merge `patch` into an existing post and refresh `updated_at`.
  fn update<'a>(
    &'a self,
    caller: &'a Principal,
    id: PostId,
    patch: PostPatch,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + 'a;

  fn delete<'a>(
    &'a self,
    caller: &'a Principal,
    id: PostId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
