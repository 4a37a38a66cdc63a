//! Entry point wiring the cache, data access and controllers together.

use std::sync::Arc;

use folio_core::{
  post::{Post, PostId},
  store::PostStore,
};

use crate::{
  access::PostAccess,
  cache::{CacheConfig, QueryCache},
  error::Result,
  infinite::InfinitePostList,
  keys::posts,
  mutation::{CreatePost, DeletePost, UpdatePost},
};

/// One shared [`QueryCache`] and [`PostAccess`] handed to every controller
/// created from it.
pub struct Client<S> {
  cache:  Arc<QueryCache>,
  access: PostAccess<S>,
}

impl<S> Clone for Client<S> {
  fn clone(&self) -> Self { Self { cache: self.cache.clone(), access: self.access.clone() } }
}

impl<S: PostStore + 'static> Client<S> {
  pub fn new(store: Arc<S>, config: CacheConfig) -> Self {
    Self::with_cache(store, Arc::new(QueryCache::new(config)))
  }

  pub fn with_cache(store: Arc<S>, cache: Arc<QueryCache>) -> Self {
    Self { cache, access: PostAccess::new(store) }
  }

  pub fn cache(&self) -> &Arc<QueryCache> { &self.cache }

  pub fn access(&self) -> &PostAccess<S> { &self.access }

  /// A post's detail, through the cache. A missing post is `Ok(None)`.
  pub async fn post(&self, id: PostId) -> Result<Option<Post>> {
    let access = self.access.clone();
    let cached = self.cache.get(&posts::detail(id), move || access.get(id)).await?;
    Ok(Option::clone(&cached))
  }

  pub fn infinite_posts(&self) -> InfinitePostList<S> {
    InfinitePostList::new(self.cache.clone(), self.access.clone())
  }

  pub fn create_post(&self) -> CreatePost<S> {
    CreatePost::new(self.cache.clone(), self.access.clone())
  }

  pub fn update_post(&self) -> UpdatePost<S> {
    UpdatePost::new(self.cache.clone(), self.access.clone())
  }

  pub fn delete_post(&self) -> DeletePost<S> {
    DeletePost::new(self.cache.clone(), self.access.clone())
  }
}
