//! Client-side form validation.
//!
//! Validation runs before any request is issued. A [`PostInput`] can only be
//! obtained from [`PostDraft::validate`], so everything downstream of the
//! form receives trimmed, bounded values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::category::Category;

/// Maximum title length, in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// Minimum password length accepted at sign-up.
pub const PASSWORD_MIN_CHARS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("title is required")]
  TitleRequired,

  #[error("title must be at most {max} characters")]
  TitleTooLong { max: usize },

  #[error("content is required")]
  ContentRequired,

  #[error("email is required")]
  EmailRequired,

  #[error("password is required")]
  PasswordRequired,

  #[error("password must be at least {min} characters")]
  PasswordTooShort { min: usize },

  #[error("passwords do not match")]
  PasswordMismatch,
}

// ─── Posts ───────────────────────────────────────────────────────────────────

/// Raw, unvalidated post form values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
  pub title:    String,
  pub content:  String,
  pub category: Option<Category>,
}

impl PostDraft {
  pub fn new(
    title: impl Into<String>,
    content: impl Into<String>,
    category: Option<Category>,
  ) -> Self {
    Self { title: title.into(), content: content.into(), category }
  }

  /// Check required fields and length bounds, trimming title and content.
  pub fn validate(&self) -> Result<PostInput, ValidationError> {
    let title = self.title.trim();
    if title.is_empty() {
      return Err(ValidationError::TitleRequired);
    }
    if title.chars().count() > TITLE_MAX_CHARS {
      return Err(ValidationError::TitleTooLong { max: TITLE_MAX_CHARS });
    }

    let content = self.content.trim();
    if content.is_empty() {
      return Err(ValidationError::ContentRequired);
    }

    Ok(PostInput {
      title:    title.to_owned(),
      content:  content.to_owned(),
      category: self.category,
    })
  }
}

/// Validated post values accepted by the mutation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostInput {
  title:    String,
  content:  String,
  category: Option<Category>,
}

impl PostInput {
  pub fn title(&self) -> &str { &self.title }

  pub fn content(&self) -> &str { &self.content }

  pub fn category(&self) -> Option<Category> { self.category }

  pub fn into_parts(self) -> (String, String, Option<Category>) {
    (self.title, self.content, self.category)
  }
}

impl From<PostInput> for PostDraft {
  fn from(input: PostInput) -> Self {
    Self { title: input.title, content: input.content, category: input.category }
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Validated email/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
  pub email:            String,
  pub password:         String,
  pub password_confirm: String,
}

impl SignUpForm {
  pub fn validate(&self) -> Result<Credentials, ValidationError> {
    let email = self.email.trim();
    if email.is_empty() {
      return Err(ValidationError::EmailRequired);
    }
    if self.password.chars().count() < PASSWORD_MIN_CHARS {
      return Err(ValidationError::PasswordTooShort { min: PASSWORD_MIN_CHARS });
    }
    if self.password != self.password_confirm {
      return Err(ValidationError::PasswordMismatch);
    }
    Ok(Credentials { email: email.to_owned(), password: self.password.clone() })
  }
}

#[derive(Debug, Clone, Default)]
pub struct SignInForm {
  pub email:    String,
  pub password: String,
}

impl SignInForm {
  pub fn validate(&self) -> Result<Credentials, ValidationError> {
    let email = self.email.trim();
    if email.is_empty() {
      return Err(ValidationError::EmailRequired);
    }
    if self.password.is_empty() {
      return Err(ValidationError::PasswordRequired);
    }
    Ok(Credentials { email: email.to_owned(), password: self.password.clone() })
  }
}
