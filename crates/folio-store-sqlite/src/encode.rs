//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexicographic order equals chronological
//! order. UUIDs are stored as hyphenated lowercase strings. Cursors are
//! URL-safe base64 over a small JSON document.

use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use folio_core::{
  auth::{Principal, UserId},
  category::Category,
  post::{Post, PostId, PostSummary, excerpt},
  store::Cursor,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Category ─────────────────────────────────────────────────────────────────

pub fn encode_category(c: Option<Category>) -> Option<&'static str> { c.map(Category::as_str) }

pub fn decode_category(s: Option<&str>) -> Result<Option<Category>> {
  s.map(|s| Category::from_str(s).map_err(|_| Error::UnknownCategory(s.to_owned())))
    .transpose()
}

// ─── Cursor ───────────────────────────────────────────────────────────────────

/// Position of the last row of a page in `(created_at DESC, seq DESC)` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
  #[serde(rename = "c")]
  pub created_at: String,
  #[serde(rename = "s")]
  pub seq:        i64,
}

pub fn encode_cursor(position: &CursorPosition) -> Result<Cursor> {
  let json = serde_json::to_vec(position)?;
  Ok(Cursor::new(B64.encode(json)))
}

pub fn decode_cursor(cursor: &Cursor) -> Result<CursorPosition> {
  let bytes = B64
    .decode(cursor.as_str())
    .map_err(|e| Error::Cursor(e.to_string()))?;
  serde_json::from_slice(&bytes).map_err(|e| Error::Cursor(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawPost`]'s field order.
pub const POST_COLUMNS: &str = "seq, post_id, title, content, category, author_id, \
                                author_email, author_display_name, created_at, updated_at";

/// Raw strings read directly from a `posts` row.
pub struct RawPost {
  pub seq:                 i64,
  pub post_id:             String,
  pub title:               String,
  pub content:             String,
  pub category:            Option<String>,
  pub author_id:           String,
  pub author_email:        String,
  pub author_display_name: Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawPost {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      seq:                 row.get(0)?,
      post_id:             row.get(1)?,
      title:               row.get(2)?,
      content:             row.get(3)?,
      category:            row.get(4)?,
      author_id:           row.get(5)?,
      author_email:        row.get(6)?,
      author_display_name: row.get(7)?,
      created_at:          row.get(8)?,
      updated_at:          row.get(9)?,
    })
  }

  pub fn position(&self) -> CursorPosition {
    CursorPosition { created_at: self.created_at.clone(), seq: self.seq }
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      id:                  PostId(decode_uuid(&self.post_id)?),
      title:               self.title,
      content:             self.content,
      category:            decode_category(self.category.as_deref())?,
      author_id:           UserId(decode_uuid(&self.author_id)?),
      author_email:        self.author_email,
      author_display_name: self.author_display_name,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }

  pub fn into_summary(self) -> Result<PostSummary> {
    Ok(PostSummary {
      id:                  PostId(decode_uuid(&self.post_id)?),
      excerpt:             excerpt(&self.content),
      title:               self.title,
      category:            decode_category(self.category.as_deref())?,
      author_id:           UserId(decode_uuid(&self.author_id)?),
      author_email:        self.author_email,
      author_display_name: self.author_display_name,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub display_name:  Option<String>,
  pub password_hash: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      email:         row.get(1)?,
      display_name:  row.get(2)?,
      password_hash: row.get(3)?,
    })
  }

  pub fn principal(&self) -> Result<Principal> {
    Ok(Principal {
      uid:          UserId(decode_uuid(&self.user_id)?),
      email:        self.email.clone(),
      display_name: self.display_name.clone(),
    })
  }
}
