//! Posts and their listing projection.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  auth::{Principal, UserId},
  category::Category,
  validate::PostInput,
};

/// Characters of content carried by a [`PostSummary`].
pub const EXCERPT_CHARS: usize = 120;

/// Characters of title shown on a list card before truncation.
pub const DISPLAY_TITLE_CHARS: usize = 50;

/// Store-assigned post identifier.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PostId(pub Uuid);

impl PostId {
  pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for PostId {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for PostId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(&self.0, f) }
}

impl FromStr for PostId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s)?)) }
}

/// A persisted blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub id:                  PostId,
  pub title:               String,
  pub content:             String,
  pub category:            Option<Category>,
  pub author_id:           UserId,
  pub author_email:        String,
  pub author_display_name: Option<String>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl Post {
  /// True once the post has been updated after creation.
  pub fn is_edited(&self) -> bool { self.updated_at != self.created_at }

  pub fn author_name(&self) -> &str {
    author_name(self.author_display_name.as_deref(), &self.author_email)
  }

  /// Whether `principal` wrote this post. Only decides which affordances a
  /// view offers; the store enforces ownership on writes.
  pub fn is_authored_by(&self, principal: &Principal) -> bool {
    self.author_id == principal.uid
  }

  pub fn summary(&self) -> PostSummary {
    PostSummary {
      id:                  self.id,
      title:               self.title.clone(),
      excerpt:             excerpt(&self.content),
      category:            self.category,
      author_id:           self.author_id,
      author_email:        self.author_email.clone(),
      author_display_name: self.author_display_name.clone(),
      created_at:          self.created_at,
      updated_at:          self.updated_at,
    }
  }
}

/// The listing projection of a [`Post`]: everything a list card renders,
/// with the body reduced to a short excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
  pub id:                  PostId,
  pub title:               String,
  pub excerpt:             String,
  pub category:            Option<Category>,
  pub author_id:           UserId,
  pub author_email:        String,
  pub author_display_name: Option<String>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl PostSummary {
  pub fn author_name(&self) -> &str {
    author_name(self.author_display_name.as_deref(), &self.author_email)
  }

  /// Title clipped to [`DISPLAY_TITLE_CHARS`], with `...` when clipped.
  pub fn display_title(&self) -> String {
    match self.title.char_indices().nth(DISPLAY_TITLE_CHARS) {
      Some((cut, _)) => format!("{}...", &self.title[..cut]),
      None => self.title.clone(),
    }
  }
}

/// Everything the store needs to create a post. Id and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPost {
  pub input:  PostInput,
  pub author: Principal,
}

/// Fields an update may change. `None` leaves the stored value untouched;
/// `category: Some(None)` clears the category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
  pub title:    Option<String>,
  pub content:  Option<String>,
  pub category: Option<Option<Category>>,
}

impl From<PostInput> for PostPatch {
  fn from(input: PostInput) -> Self {
    let (title, content, category) = input.into_parts();
    Self { title: Some(title), content: Some(content), category: Some(category) }
  }
}

/// Display name, falling back to the local part of the email address.
fn author_name<'a>(display_name: Option<&'a str>, email: &'a str) -> &'a str {
  match display_name {
    Some(name) if !name.trim().is_empty() => name,
    _ => email.split('@').next().unwrap_or(email),
  }
}

/// The first [`EXCERPT_CHARS`] characters of `content`.
pub fn excerpt(content: &str) -> String {
  match content.char_indices().nth(EXCERPT_CHARS) {
    Some((cut, _)) => content[..cut].to_owned(),
    None => content.to_owned(),
  }
}
