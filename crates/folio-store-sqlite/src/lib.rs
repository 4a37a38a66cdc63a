//! SQLite backend for Folio.
//!
//! Provides both collaborator implementations the client needs: a
//! [`SqlitePostStore`] for the `posts` collection and a [`SqliteAuth`]
//! account provider. Both wrap [`tokio_rusqlite`] so all database access runs
//! on a dedicated thread without blocking the async runtime.

mod auth;
mod encode;
mod schema;
mod store;

pub mod error;

pub use auth::SqliteAuth;
pub use error::{Error, Result};
pub use store::SqlitePostStore;

use std::path::Path;

/// Open one database file and return a post store and an auth provider that
/// share its connection.
pub async fn open(path: impl AsRef<Path>) -> Result<(SqlitePostStore, SqliteAuth)> {
  let conn = tokio_rusqlite::Connection::open(path).await?;
  from_connection(conn).await
}

/// In-memory variant of [`open`], for tests.
pub async fn open_in_memory() -> Result<(SqlitePostStore, SqliteAuth)> {
  let conn = tokio_rusqlite::Connection::open_in_memory().await?;
  from_connection(conn).await
}

async fn from_connection(
  conn: tokio_rusqlite::Connection,
) -> Result<(SqlitePostStore, SqliteAuth)> {
  schema::init(&conn).await?;
  Ok((SqlitePostStore::from_connection(conn.clone()), SqliteAuth::from_connection(conn)))
}
