//! The closed set of post categories.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// A post's topic. Posts may also carry no category at all.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
  Javascript,
  Typescript,
  React,
  Firebase,
  Etc,
}

impl Category {
  /// Human-readable label shown on filter chips and post cards.
  pub fn label(self) -> &'static str {
    match self {
      Self::Javascript => "JavaScript",
      Self::Typescript => "TypeScript",
      Self::React => "React",
      Self::Firebase => "Firebase",
      Self::Etc => "Etc",
    }
  }

  /// The stable lowercase identifier used in storage and on the command line.
  pub fn as_str(self) -> &'static str { self.into() }

  /// All categories in display order.
  pub fn all() -> impl Iterator<Item = Category> { Self::iter() }
}
