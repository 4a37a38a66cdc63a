//! [`SqlitePostStore`], the SQLite implementation of [`PostStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use folio_core::{
  auth::Principal,
  post::{NewPost, Post, PostId, PostPatch},
  store::{Page, PageQuery, PostStore},
};

use crate::{
  Error, Result,
  encode::{
    POST_COLUMNS, RawPost, decode_cursor, encode_category, encode_cursor, encode_dt,
    encode_uuid, now,
  },
  schema,
};

/// Result of an ownership-checked write, decided inside one transaction.
enum WriteOutcome<T> {
  Missing,
  Forbidden,
  Done(T),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Folio post collection backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqlitePostStore {
  conn: tokio_rusqlite::Connection,
}

impl SqlitePostStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    schema::init(&conn).await?;
    Ok(Self { conn })
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    schema::init(&conn).await?;
    Ok(Self { conn })
  }

  /// Wrap a connection whose schema is already initialised.
  pub(crate) fn from_connection(conn: tokio_rusqlite::Connection) -> Self { Self { conn } }

  /// Map a [`WriteOutcome`] to the store's error taxonomy.
  fn settle<T>(outcome: WriteOutcome<T>, caller: &Principal, id: PostId) -> Result<T> {
    match outcome {
      WriteOutcome::Missing => Err(folio_core::Error::PostNotFound(id).into()),
      WriteOutcome::Forbidden => {
        tracing::warn!(post = %id, principal = %caller.uid, "write refused: not the author");
        Err(
          folio_core::Error::PermissionDenied { post: id, principal: caller.uid }.into(),
        )
      }
      WriteOutcome::Done(value) => Ok(value),
    }
  }
}

// ─── PostStore impl ──────────────────────────────────────────────────────────

impl PostStore for SqlitePostStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn page(&self, query: &PageQuery) -> Result<Page> {
    let category = encode_category(query.filter.category).map(str::to_owned);
    let (after_at, after_seq) = match query.cursor.as_ref().map(decode_cursor).transpose()? {
      Some(position) => (Some(position.created_at), Some(position.seq)),
      None           => (None, None),
    };
    let limit = query.limit as i64;

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {POST_COLUMNS}
           FROM posts
           WHERE (?1 IS NULL OR category = ?1)
             AND (?2 IS NULL
                  OR created_at < ?2
                  OR (created_at = ?2 AND seq < ?3))
           ORDER BY created_at DESC, seq DESC
           LIMIT ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![category, after_at, after_seq, limit],
            RawPost::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // A full page may have a successor; a short one ends the listing.
    let next_cursor = if query.limit > 0 && raws.len() == query.limit {
      raws
        .last()
        .map(|raw| encode_cursor(&raw.position()))
        .transpose()?
    } else {
      None
    };

    let items = raws
      .into_iter()
      .map(RawPost::into_summary)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page { items, next_cursor, filter: query.filter })
  }

  async fn get(&self, id: PostId) -> Result<Option<Post>> {
    let id_str = encode_uuid(id.0);

    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1"),
              rusqlite::params![id_str],
              RawPost::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create(&self, new_post: NewPost) -> Result<Post> {
    let NewPost { input, author } = new_post;
    let (title, content, category) = input.into_parts();
    let created_at = now();

    let post = Post {
      id: PostId::new(),
      title,
      content,
      category,
      author_id: author.uid,
      author_email: author.email,
      author_display_name: author.display_name,
      created_at,
      updated_at: created_at,
    };

    let id_str       = encode_uuid(post.id.0);
    let title        = post.title.clone();
    let content      = post.content.clone();
    let category_str = encode_category(post.category).map(str::to_owned);
    let author_str   = encode_uuid(post.author_id.0);
    let email        = post.author_email.clone();
    let display_name = post.author_display_name.clone();
    let at_str       = encode_dt(created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO posts (
             post_id, title, content, category,
             author_id, author_email, author_display_name,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str,
            title,
            content,
            category_str,
            author_str,
            email,
            display_name,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(post = %post.id, author = %post.author_id, "post created");
    Ok(post)
  }

  async fn update(&self, caller: &Principal, id: PostId, patch: PostPatch) -> Result<Post> {
    let id_str     = encode_uuid(id.0);
    let caller_str = encode_uuid(caller.uid.0);
    let at_str     = encode_dt(now());
    let PostPatch { title, content, category } = patch;
    let (set_category, category_str) = match category {
      Some(c) => (true, encode_category(c).map(str::to_owned)),
      None    => (false, None),
    };

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let author: Option<String> = tx
          .query_row(
            "SELECT author_id FROM posts WHERE post_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;

        let outcome = match author {
          None => WriteOutcome::Missing,
          Some(author) if author != caller_str => WriteOutcome::Forbidden,
          Some(_) => {
            tx.execute(
              "UPDATE posts SET
                 title      = COALESCE(?2, title),
                 content    = COALESCE(?3, content),
                 category   = CASE WHEN ?4 THEN ?5 ELSE category END,
                 updated_at = ?6
               WHERE post_id = ?1",
              rusqlite::params![id_str, title, content, set_category, category_str, at_str],
            )?;
            let raw = tx.query_row(
              &format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1"),
              rusqlite::params![id_str],
              RawPost::from_row,
            )?;
            WriteOutcome::Done(raw)
          }
        };
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Self::settle(outcome, caller, id)?.into_post()
  }

  async fn delete(&self, caller: &Principal, id: PostId) -> Result<()> {
    let id_str     = encode_uuid(id.0);
    let caller_str = encode_uuid(caller.uid.0);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let author: Option<String> = tx
          .query_row(
            "SELECT author_id FROM posts WHERE post_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;

        let outcome = match author {
          None => WriteOutcome::Missing,
          Some(author) if author != caller_str => WriteOutcome::Forbidden,
          Some(_) => {
            tx.execute("DELETE FROM posts WHERE post_id = ?1", rusqlite::params![id_str])?;
            WriteOutcome::Done(())
          }
        };
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Self::settle(outcome, caller, id)
  }
}
