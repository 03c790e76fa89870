//! booker server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus
//! `BOOKER_*` environment variables, opens the SQLite store, starts the
//! expiry sweeper, and serves the JSON API under `/api` over HTTP.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use booker_core::{
  notify::Notifier,
  store::{CapacityStore, Catalog},
};
use booker_engine::{BookingEngine, LogNotifier, Sweeper};
use booker_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Event booking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("invalid configuration in {:?}", cli.config))?;

  // Open SQLite store.
  let store_path = cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine =
    Arc::new(BookingEngine::new(store, LogNotifier).with_retry(cfg.retry_policy()));

  let sweeper = Sweeper::new(engine.clone(), cfg.sweep_interval())
    .context("failed to configure sweeper")?
    .spawn();

  let app = app(engine, &cfg);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error");

  sweeper.stop().await;
  tracing::info!("server stopped");
  served
}

/// The JSON API, served under `/api`.
fn app<S, N>(engine: Arc<BookingEngine<S, N>>, cfg: &ServerConfig) -> Router
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  Router::new().nest("/api", booker_api::api_router(engine, cfg.request_timeout()))
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(error) = signal::ctrl_c().await {
      tracing::error!(%error, "failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(error) => {
        tracing::error!(%error, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
    () = terminate => tracing::info!("received SIGTERM, shutting down"),
  }
}
