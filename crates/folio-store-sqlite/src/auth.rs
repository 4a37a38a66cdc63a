//! [`SqliteAuth`]: email/password accounts stored next to the posts.

use std::path::Path;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;
use rusqlite::OptionalExtension as _;

use folio_core::{
  auth::{AuthService, Principal, UserId},
  session::{SessionHub, Subscription},
  validate::PASSWORD_MIN_CHARS,
};

use crate::{
  Error, Result,
  encode::{RawUser, encode_dt, encode_uuid, now},
  schema,
};

/// Account provider backed by the `users` table.
///
/// The signed-in principal lives in memory; clones share it.
#[derive(Clone)]
pub struct SqliteAuth {
  conn:    tokio_rusqlite::Connection,
  session: SessionHub,
}

impl SqliteAuth {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    schema::init(&conn).await?;
    Ok(Self::from_connection(conn))
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    schema::init(&conn).await?;
    Ok(Self::from_connection(conn))
  }

  pub(crate) fn from_connection(conn: tokio_rusqlite::Connection) -> Self {
    Self { conn, session: SessionHub::new() }
  }

  /// The principal currently signed in, if any.
  pub fn current(&self) -> Option<Principal> { self.session.current() }

  /// Restore a persisted session for `uid` without a password.
  ///
  /// Returns `None` (and leaves the session signed out) when the account no
  /// longer exists.
  pub async fn resume(&self, uid: UserId) -> Result<Option<Principal>> {
    let id_str = encode_uuid(uid.0);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, email, display_name, password_hash
               FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    let principal = raw.as_ref().map(RawUser::principal).transpose()?;
    self.session.set(principal.clone());
    Ok(principal)
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<RawUser>> {
    let email = email.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, email, display_name, password_hash
               FROM users WHERE email = ?1",
              rusqlite::params![email],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }
}

impl AuthService for SqliteAuth {
  type Error = Error;

  async fn sign_up(
    &self,
    email: &str,
    password: &str,
    display_name: Option<&str>,
  ) -> Result<Principal> {
    let email = email.trim();
    if !looks_like_email(email) {
      return Err(folio_core::Error::InvalidEmail.into());
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
      return Err(folio_core::Error::WeakPassword.into());
    }

    let principal = Principal {
      uid:          UserId::new(),
      email:        email.to_owned(),
      display_name: display_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned),
    };
    let hash = hash_password(password)?;

    let id_str       = encode_uuid(principal.uid.0);
    let email_str    = principal.email.clone();
    let display_name = principal.display_name.clone();
    let at_str       = encode_dt(now());

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !taken {
          tx.execute(
            "INSERT INTO users (user_id, email, display_name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id_str, email_str, display_name, hash, at_str],
          )?;
        }
        tx.commit()?;
        Ok(!taken)
      })
      .await?;

    if !inserted {
      return Err(folio_core::Error::EmailInUse.into());
    }

    tracing::info!(uid = %principal.uid, "account created");
    self.session.set(Some(principal.clone()));
    Ok(principal)
  }

  async fn sign_in(&self, email: &str, password: &str) -> Result<Principal> {
    let raw = self
      .find_by_email(email.trim())
      .await?
      .ok_or(folio_core::Error::InvalidCredentials)?;

    if !verify_password(password, &raw.password_hash) {
      tracing::debug!("sign-in rejected: bad password");
      return Err(folio_core::Error::InvalidCredentials.into());
    }

    let principal = raw.principal()?;
    tracing::info!(uid = %principal.uid, "signed in");
    self.session.set(Some(principal.clone()));
    Ok(principal)
  }

  async fn sign_out(&self) -> Result<()> {
    self.session.set(None);
    Ok(())
  }

  fn subscribe<F>(&self, callback: F) -> Subscription
  where
    F: Fn(Option<&Principal>) + Send + Sync + 'static,
  {
    self.session.subscribe(callback)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Hash `password` into an argon2id PHC string with a fresh salt.
fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

/// A single `@` with non-empty local and domain parts, and no whitespace.
fn looks_like_email(email: &str) -> bool {
  match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  }
}
