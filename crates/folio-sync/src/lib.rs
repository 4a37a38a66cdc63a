//! Client-side data synchronization for Folio.
//!
//! Everything here sits between a view layer and a [`PostStore`]:
//!
//! - [`QueryCache`]: keyed, de-duplicating cache shared by all components.
//! - [`PostAccess`]: domain operations mapped onto store calls.
//! - [`InfinitePostList`]: cursor pagination with category filtering.
//! - [`CreatePost`], [`UpdatePost`], [`DeletePost`]: writes that invalidate
//!   the regions of the cache they make stale.
//! - [`Session`]: the current principal as reported by an auth service.
//!
//! [`PostStore`]: folio_core::store::PostStore

mod lock;

pub mod access;
pub mod cache;
pub mod client;
pub mod error;
pub mod infinite;
pub mod keys;
pub mod mutation;
pub mod session;

pub use access::PostAccess;
pub use cache::{CacheConfig, CacheEvent, EntryStatus, QueryCache};
pub use client::Client;
pub use error::{Error, Result};
pub use infinite::{DEFAULT_PAGE_SIZE, InfinitePostList, ListSnapshot};
pub use keys::QueryKey;
pub use mutation::{CreatePost, DeletePost, MutationState, MutationStatus, UpdatePost};
pub use session::{Session, SessionState};

#[cfg(test)]
mod tests;
