//! Command handlers.

use std::{
  fs,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context, Result, bail};
use folio_core::{
  auth::{AuthService, UserId},
  category::Category,
  post::{Post, PostId, PostSummary},
  store::PostFilter,
  validate::{PostDraft, SignInForm, SignUpForm},
};
use folio_store_sqlite::{SqliteAuth, SqlitePostStore};
use folio_sync::{Client, Session};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::settings::ClientConfig;

/// What is remembered between invocations while signed in.
#[derive(Serialize, Deserialize)]
struct StoredSession {
  uid: UserId,
}

pub struct App {
  client:       Client<SqlitePostStore>,
  auth:         SqliteAuth,
  session:      Session,
  session_path: PathBuf,
  page_size:    usize,
}

impl App {
  /// Open the database and restore a remembered session, if any.
  pub async fn open(config: &ClientConfig) -> Result<Self> {
    let (store, auth) = folio_store_sqlite::open(&config.database)
      .await
      .with_context(|| format!("failed to open database at {:?}", config.database))?;

    let session = Session::attach(&auth);
    let app = Self {
      client: Client::new(Arc::new(store), config.cache_config()),
      auth,
      session,
      session_path: config.session_path(),
      page_size: config.page_size,
    };
    app.restore_session().await?;
    Ok(app)
  }

  async fn restore_session(&self) -> Result<()> {
    let Some(stored) = read_session(&self.session_path)? else {
      return Ok(());
    };
    if self.auth.resume(stored.uid).await?.is_none() {
      debug!(uid = %stored.uid, "remembered account no longer exists");
      remove_session(&self.session_path)?;
    }
    Ok(())
  }

  fn remember(&self, uid: UserId) -> Result<()> {
    let json = serde_json::to_string(&StoredSession { uid })?;
    fs::write(&self.session_path, json)
      .with_context(|| format!("failed to write {}", self.session_path.display()))
  }

  // ─── Accounts ─────────────────────────────────────────────────────────────

  pub async fn sign_up(&self, form: SignUpForm, name: Option<String>) -> Result<()> {
    let credentials = form.validate()?;
    let principal = self
      .auth
      .sign_up(&credentials.email, &credentials.password, name.as_deref())
      .await?;
    self.remember(principal.uid)?;
    info!(uid = %principal.uid, "signed up");
    println!("Signed up as {}", principal.email);
    Ok(())
  }

  pub async fn sign_in(&self, form: SignInForm) -> Result<()> {
    let credentials = form.validate()?;
    let principal = self.auth.sign_in(&credentials.email, &credentials.password).await?;
    self.remember(principal.uid)?;
    println!("Signed in as {}", principal.email);
    Ok(())
  }

  pub async fn sign_out(&self) -> Result<()> {
    self.auth.sign_out().await?;
    remove_session(&self.session_path)?;
    println!("Signed out");
    Ok(())
  }

  pub fn whoami(&self) {
    match self.session.current() {
      Some(principal) => match &principal.display_name {
        Some(name) => println!("{name} <{}>", principal.email),
        None => println!("{}", principal.email),
      },
      None => println!("Not signed in"),
    }
  }

  // ─── Reading ──────────────────────────────────────────────────────────────

  /// Print up to `pages` pages of the listing, fetching each next page the
  /// way a reader scrolling to the bottom would.
  pub async fn list(
    &self,
    category: Option<Category>,
    page_size: Option<usize>,
    pages: usize,
  ) -> Result<()> {
    let list = self.client.infinite_posts();
    list
      .initialize(PostFilter::from(category), page_size.unwrap_or(self.page_size))
      .await?;
    for _ in 1..pages {
      if !list.fetch_next_page().await? {
        break;
      }
    }

    let snapshot = list.snapshot();
    if snapshot.items.is_empty() {
      println!("No posts yet");
      return Ok(());
    }
    for item in &snapshot.items {
      print_summary(item);
    }
    if snapshot.has_more {
      println!("(more posts available; use --pages to see them)");
    }
    Ok(())
  }

  pub async fn show(&self, id: PostId) -> Result<()> {
    match self.client.post(id).await? {
      Some(post) => print_post(&post),
      None => println!("not found"),
    }
    Ok(())
  }

  // ─── Writing ──────────────────────────────────────────────────────────────

  pub async fn write(&self, draft: PostDraft) -> Result<()> {
    let author = self.session.require()?;
    let input = draft.validate()?;
    let id = self.client.create_post().mutate(input, &author).await?;
    println!("Created {id}");
    Ok(())
  }

  /// Apply the given changes on top of the stored post.
  pub async fn edit(
    &self,
    id: PostId,
    title: Option<String>,
    content: Option<String>,
    category: Option<Option<Category>>,
  ) -> Result<()> {
    let caller = self.session.require()?;
    let Some(post) = self.client.post(id).await? else {
      bail!("post {id} not found");
    };
    if !post.is_authored_by(&caller) {
      bail!("only the author can edit this post");
    }

    let draft = PostDraft {
      title:    title.unwrap_or(post.title),
      content:  content.unwrap_or(post.content),
      category: category.unwrap_or(post.category),
    };
    let input = draft.validate()?;
    let updated_at = self.client.update_post().mutate(&caller, id, input).await?;
    println!("Updated {id} at {}", updated_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
  }

  pub async fn delete(&self, id: PostId) -> Result<()> {
    let caller = self.session.require()?;
    self.client.delete_post().mutate(&caller, id).await?;
    println!("Deleted {id}");
    Ok(())
  }
}

pub fn print_categories() {
  for category in Category::all() {
    println!("{:<12} {}", category.as_str(), category.label());
  }
}

fn print_summary(item: &PostSummary) {
  let category = item.category.map(Category::label).unwrap_or("-");
  println!(
    "{}  {}  [{}]  by {}  {}",
    item.id,
    item.display_title(),
    category,
    item.author_name(),
    item.created_at.format("%Y-%m-%d"),
  );
  println!("    {}", item.excerpt.replace('\n', " "));
}

fn print_post(post: &Post) {
  println!("{}", post.title);
  let category = post.category.map(Category::label).unwrap_or("-");
  print!(
    "by {}  [{}]  {}",
    post.author_name(),
    category,
    post.created_at.format("%Y-%m-%d %H:%M")
  );
  if post.is_edited() {
    print!("  (edited {})", post.updated_at.format("%Y-%m-%d %H:%M"));
  }
  println!("\n");
  println!("{}", post.content);
}

fn read_session(path: &Path) -> Result<Option<StoredSession>> {
  if !path.exists() {
    return Ok(None);
  }
  let raw =
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  let stored = serde_json::from_str(&raw)
    .with_context(|| format!("failed to parse {}", path.display()))?;
  Ok(Some(stored))
}

fn remove_session(path: &Path) -> Result<()> {
  if path.exists() {
    fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
  }
  Ok(())
}
