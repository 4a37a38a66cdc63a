//! Core types and trait definitions for Folio.
//!
//! No database and no runtime. Backends implement [`store::PostStore`] and
//! [`auth::AuthService`]; the client-side sync layer depends on those traits
//! only.

// Trait methods spell out `impl Future + Send` where callers need it.
#![allow(async_fn_in_trait)]

pub mod auth;
pub mod category;
pub mod error;
pub mod post;
pub mod session;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
pub use validate::ValidationError;
