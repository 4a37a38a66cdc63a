//! `folio`: command-line client for a Folio blog database.
//!
//! # Usage
//!
//! ```
//! folio --database blog.db sign-up --email ada@example.com --password secret1 --confirm secret1
//! folio --database blog.db write --title "Hello" --content "First post" --category react
//! folio --config ~/.config/folio/config.toml list --category react --pages 2
//! ```

mod app;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use app::App;
use clap::{Parser, Subcommand};
use folio_core::{
  category::Category,
  post::PostId,
  validate::{PostDraft, SignInForm, SignUpForm},
};
use settings::ClientConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Command-line client for a Folio blog")]
struct Args {
  /// Path to a TOML config file (database, page_size, cache_capacity,
  /// stale_after_secs).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// SQLite database file. Overrides the config file.
  #[arg(long, value_name = "PATH")]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create an account and sign in as it.
  SignUp {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: String,
    /// Repeat the password.
    #[arg(long)]
    confirm:  String,
    /// Display name shown on posts.
    #[arg(long)]
    name:     Option<String>,
  },
  SignIn {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: String,
  },
  SignOut,
  /// Show the signed-in account.
  Whoami,
  /// List posts, newest first.
  List {
    #[arg(long)]
    category:  Option<Category>,
    #[arg(long)]
    page_size: Option<usize>,
    /// Number of pages to load.
    #[arg(long, default_value_t = 1)]
    pages:     usize,
  },
  /// Show one post in full.
  Show { id: PostId },
  /// Publish a new post.
  Write {
    #[arg(long)]
    title:    String,
    #[arg(long)]
    content:  String,
    #[arg(long)]
    category: Option<Category>,
  },
  /// Change a post you wrote. Omitted fields keep their current value.
  Edit {
    id:          PostId,
    #[arg(long)]
    title:       Option<String>,
    #[arg(long)]
    content:     Option<String>,
    #[arg(long, conflicts_with = "no_category")]
    category:    Option<Category>,
    /// Clear the post's category.
    #[arg(long)]
    no_category: bool,
  },
  /// Delete a post you wrote.
  Delete { id: PostId },
  /// List the available categories.
  Categories,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  if matches!(args.command, Command::Categories) {
    app::print_categories();
    return Ok(());
  }

  // Flags override the config file, which overrides defaults.
  let mut config = ClientConfig::load(args.config.as_deref())?;
  if let Some(database) = args.database {
    config.database = database;
  }

  let app = App::open(&config).await?;
  match args.command {
    Command::SignUp { email, password, confirm, name } => {
      let form = SignUpForm { email, password, password_confirm: confirm };
      app.sign_up(form, name).await
    }
    Command::SignIn { email, password } => app.sign_in(SignInForm { email, password }).await,
    Command::SignOut => app.sign_out().await,
    Command::Whoami => {
      app.whoami();
      Ok(())
    }
    Command::List { category, page_size, pages } => app.list(category, page_size, pages).await,
    Command::Show { id } => app.show(id).await,
    Command::Write { title, content, category } => {
      app.write(PostDraft::new(title, content, category)).await
    }
    Command::Edit { id, title, content, category, no_category } => {
      let category = if no_category { Some(None) } else { category.map(Some) };
      app.edit(id, title, content, category).await
    }
    Command::Delete { id } => app.delete(id).await,
    Command::Categories => Ok(()),
  }
}
