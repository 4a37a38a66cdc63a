//! Domain operations on the `posts` collection.
//!
//! [`PostAccess`] is the only place the sync layer talks to a [`PostStore`].
//! Read operations return `'static` boxed futures so they can be handed to the
//! query cache as fetches.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_core::{
  auth::Principal,
  post::{NewPost, Post, PostId, PostPatch},
  store::{Cursor, Page, PageQuery, PostFilter, PostStore},
  validate::PostInput,
};
use futures::{FutureExt, future::BoxFuture};
use tracing::debug;

use crate::error::{Result, from_backend};

pub struct PostAccess<S> {
  store: Arc<S>,
}

impl<S> Clone for PostAccess<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: PostStore + 'static> PostAccess<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// One page of posts, newest first, starting after `cursor`.
  pub fn page(
    &self,
    filter: PostFilter,
    cursor: Option<Cursor>,
    limit: usize,
  ) -> BoxFuture<'static, Result<Page>> {
    let store = self.store.clone();
    async move {
      debug!(%filter, cursor = ?cursor.as_ref().map(Cursor::as_str), limit, "fetching page");
      let query = PageQuery { filter, cursor, limit };
      let page = store.page(&query).await.map_err(from_backend)?;
      debug!(%filter, items = page.items.len(), more = page.next_cursor.is_some(), "page fetched");
      Ok(page)
    }
    .boxed()
  }

  /// A single post. A missing post is `Ok(None)`, not an error.
  pub fn get(&self, id: PostId) -> BoxFuture<'static, Result<Option<Post>>> {
    let store = self.store.clone();
    async move {
      debug!(%id, "fetching post");
      store.get(id).await.map_err(from_backend)
    }
    .boxed()
  }

  pub async fn create(&self, input: PostInput, author: &Principal) -> Result<Post> {
    debug!(author = %author.uid, title = input.title(), "creating post");
    let post = self
      .store
      .create(NewPost { input, author: author.clone() })
      .await
      .map_err(from_backend)?;
    debug!(id = %post.id, "post created");
    Ok(post)
  }

  /// Replace title, content and category. Returns the new `updated_at`.
  pub async fn update(
    &self,
    caller: &Principal,
    id: PostId,
    input: PostInput,
  ) -> Result<DateTime<Utc>> {
    debug!(%id, caller = %caller.uid, "updating post");
    let post = self
      .store
      .update(caller, id, PostPatch::from(input))
      .await
      .map_err(from_backend)?;
    Ok(post.updated_at)
  }

  pub async fn delete(&self, caller: &Principal, id: PostId) -> Result<()> {
    debug!(%id, caller = %caller.uid, "deleting post");
    self.store.delete(caller, id).await.map_err(from_backend)
  }
}
