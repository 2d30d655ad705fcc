//! Stockroom server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! inventory database, migrates it, and serves the JSON API over HTTP.
//!
//! ```text
//! stockroom --migrate-only   # migrate, print what happened, exit
//! stockroom --verify         # audit cached quantities, exit 1 on drift
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use stockroom_core::store::InventoryStore as _;
use stockroom_store_sqlite::{SqliteStore, StoreConfig};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Stockroom inventory server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run schema migrations, print the result and exit.
  #[arg(long)]
  migrate_only: bool,

  /// Check cached quantities against their source rows and exit.
  #[arg(long, conflicts_with = "migrate_only")]
  verify: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = settings::load(&cli.config)?;
  let store = open_store(&server_cfg).await?;

  if cli.migrate_only {
    println!("{}", store.migration_report());
    store.close().await?;
    return Ok(());
  }

  if cli.verify {
    let drift = store.verify_stock().await.context("stock audit failed")?;
    store.close().await?;
    if drift.is_empty() {
      println!("stock is consistent");
      return Ok(());
    }
    for entry in &drift {
      println!("{}", serde_json::to_string(entry)?);
    }
    anyhow::bail!("{} cached quantities disagree with their source rows", drift.len());
  }

  let app = stockroom_api::api_router(Arc::new(store.clone()))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  store.close().await.context("failed to close store")?;
  tracing::info!("shut down");
  Ok(())
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let path = expand_tilde(&cfg.store_path);
  let store_cfg = StoreConfig {
    path:         path.clone(),
    busy_timeout: Duration::from_millis(cfg.busy_timeout_ms),
  };

  SqliteStore::open_with(store_cfg)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}
