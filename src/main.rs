mod app;
mod branches;
mod cache;
mod config;
mod db;
mod error;
mod event;
mod favorites;
mod logging;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use crate::app::{App, AppContext, Route};
use crate::branches::{BranchClient, CachedBranchClient};
use crate::cache::{MemoryStorage, NoopStorage, SqliteStorage, TtlCache};
use crate::config::{CacheBackend, Config};
use crate::db::Database;
use crate::favorites::Favorites;

#[derive(Parser, Debug)]
#[command(name = "branches")]
#[command(about = "A terminal UI for browsing and bookmarking bank branches by IFSC")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/branches-tui/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Open the detail view for this IFSC
  #[arg(short, long)]
  branch: Option<String>,

  /// Override the API base URL
  #[arg(long)]
  base_url: Option<String>,

  /// Drop every cached response before starting
  #[arg(long)]
  clear_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Held until exit so buffered log lines are flushed
  let _log_guard = logging::init()?;

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }

  let route = Route::from_branch(args.branch.as_deref())?;

  let cache = open_cache(config.cache.backend)?;
  if args.clear_cache {
    cache.clear()?;
    tracing::info!("cache cleared");
  }

  let http = BranchClient::new(&config)?;
  let host = http.host().to_string();
  let client = CachedBranchClient::new(Arc::new(http), cache);

  let favorites = Favorites::load(Rc::new(Database::open()?)).shared();

  tracing::info!(
    base_url = %config.api.base_url,
    backend = ?config.cache.backend,
    route = ?route,
    "starting"
  );

  let ctx = AppContext {
    client,
    favorites,
    cities: config.listing.cities,
    page_size: config.listing.page_size,
    host,
  };

  // Initialize and run the app
  let mut app = App::new(ctx, route);
  app.run().await?;

  Ok(())
}

fn open_cache(backend: CacheBackend) -> Result<TtlCache> {
  let cache = match backend {
    CacheBackend::Memory => TtlCache::new(MemoryStorage::new()),
    CacheBackend::Sqlite => TtlCache::new(SqliteStorage::open()?),
    CacheBackend::None => TtlCache::new(NoopStorage),
  };
  Ok(cache)
}
