//! Client configuration: optional TOML file, then `FOLIO_*` environment
//! variables, then command-line flags.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use folio_sync::{CacheConfig, DEFAULT_PAGE_SIZE};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  /// SQLite database file. A leading `~/` is expanded.
  pub database:         PathBuf,
  pub page_size:        usize,
  pub cache_capacity:   usize,
  /// Seconds before a cached query is refetched; unset keeps entries until
  /// a mutation invalidates them.
  pub stale_after_secs: Option<u64>,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      database:         PathBuf::from("folio.db"),
      page_size:        DEFAULT_PAGE_SIZE,
      cache_capacity:   CacheConfig::DEFAULT_CAPACITY.get(),
      stale_after_secs: None,
    }
  }
}

impl ClientConfig {
  /// Read `file` (if given) and the environment.
  pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
    let mut builder = config::Config::builder();
    if let Some(path) = file {
      builder = builder.add_source(config::File::from(path).required(true));
    }
    let settings = builder
      .add_source(config::Environment::with_prefix("FOLIO").try_parsing(true))
      .build()
      .context("failed to read configuration")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ClientConfig")?;
    cfg.database = expand_tilde(&cfg.database);
    Ok(cfg)
  }

  pub fn cache_config(&self) -> CacheConfig {
    let cache = CacheConfig::with_capacity(self.cache_capacity);
    match self.stale_after_secs {
      Some(secs) => cache.stale_after(Duration::from_secs(secs)),
      None => cache,
    }
  }

  /// Where the signed-in account is remembered between invocations.
  pub fn session_path(&self) -> PathBuf {
    let dir = self.database.parent().unwrap_or_else(|| Path::new(""));
    dir.join("session.json")
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> ClientConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn missing_keys_fall_back_to_defaults() {
    assert_eq!(parse(""), ClientConfig::default());
    let cfg = parse("page_size = 5");
    assert_eq!(cfg.page_size, 5);
    assert_eq!(cfg.database, PathBuf::from("folio.db"));
  }

  #[test]
  fn cache_settings_carry_over() {
    let cfg = parse("cache_capacity = 0\nstale_after_secs = 30");
    let cache = cfg.cache_config();
    assert_eq!(cache.capacity.get(), 1);
    assert_eq!(cache.stale_after, Some(Duration::from_secs(30)));
    assert_eq!(ClientConfig::default().cache_config(), CacheConfig::default());
  }

  #[test]
  fn session_file_sits_next_to_the_database() {
    let cfg = parse("database = \"/var/lib/folio/blog.db\"");
    assert_eq!(cfg.session_path(), PathBuf::from("/var/lib/folio/session.json"));
    assert_eq!(ClientConfig::default().session_path(), PathBuf::from("session.json"));
  }
}
