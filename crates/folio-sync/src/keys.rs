//! Semantic cache keys.
//!
//! Keys are hierarchical so a whole region can be invalidated by prefix:
//!
//! | Key | Segments |
//! |-----|----------|
//! | every post query | `posts` |
//! | every listing | `posts/list` |
//! | one filter | `posts/list/<filter>` |
//! | one page size of a filter | `posts/list/<filter>/<limit>` |
//! | one page | `posts/list/<filter>/<limit>/<cursor or start>` |
//! | one post | `posts/detail/<id>` |

use std::fmt;

use folio_core::{
  post::PostId,
  store::{Cursor, PostFilter},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
  Name(&'static str),
  Filter(PostFilter),
  /// Page size a listing was fetched with.
  Limit(usize),
  /// `None` is the first page of a listing.
  Cursor(Option<Cursor>),
  Post(PostId),
}

impl fmt::Display for Segment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Name(name) => f.write_str(name),
      Self::Filter(filter) => write!(f, "{filter}"),
      Self::Limit(limit) => write!(f, "{limit}"),
      Self::Cursor(Some(cursor)) => f.write_str(cursor.as_str()),
      Self::Cursor(None) => f.write_str("start"),
      Self::Post(id) => write!(f, "{id}"),
    }
  }
}

/// A cache key: an ordered path of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<Segment>);

impl QueryKey {
  pub fn new(segments: Vec<Segment>) -> Self { Self(segments) }

  pub fn segments(&self) -> &[Segment] { &self.0 }

  /// Whether `prefix` is this key or one of its ancestors.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool { self.0.starts_with(&prefix.0) }

  fn child(&self, segment: Segment) -> Self {
    let mut segments = self.0.clone();
    segments.push(segment);
    Self(segments)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, segment) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("/")?;
      }
      write!(f, "{segment}")?;
    }
    Ok(())
  }
}

/// Key builders for the `posts` collection.
pub mod posts {
  use super::*;

  pub fn all() -> QueryKey { QueryKey(vec![Segment::Name("posts")]) }

  pub fn lists() -> QueryKey { all().child(Segment::Name("list")) }

  pub fn list(filter: PostFilter) -> QueryKey { lists().child(Segment::Filter(filter)) }

  pub fn page(filter: PostFilter, limit: usize, cursor: Option<&Cursor>) -> QueryKey {
    list(filter)
      .child(Segment::Limit(limit))
      .child(Segment::Cursor(cursor.cloned()))
  }

  pub fn details() -> QueryKey { all().child(Segment::Name("detail")) }

  pub fn detail(id: PostId) -> QueryKey { details().child(Segment::Post(id)) }
}
