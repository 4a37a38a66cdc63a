//! SQL schema for the Folio SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

use crate::Result;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    display_name  TEXT,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- `seq` breaks ties between posts created in the same microsecond and is
-- part of every page cursor.
CREATE TABLE IF NOT EXISTS posts (
    seq                 INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id             TEXT NOT NULL UNIQUE,
    title               TEXT NOT NULL,
    content             TEXT NOT NULL,
    category            TEXT,            -- lowercase Category id or NULL
    author_id           TEXT NOT NULL,
    author_email        TEXT NOT NULL,
    author_display_name TEXT,
    created_at          TEXT NOT NULL,   -- RFC 3339 UTC, fixed width; server-assigned
    updated_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS posts_created_idx  ON posts(created_at DESC, seq DESC);
CREATE INDEX IF NOT EXISTS posts_category_idx ON posts(category, created_at DESC, seq DESC);

PRAGMA user_version = 1;
";

pub async fn init(conn: &tokio_rusqlite::Connection) -> Result<()> {
  conn
    .call(|conn| {
      conn.execute_batch(SCHEMA)?;
      Ok(())
    })
    .await?;
  Ok(())
}
