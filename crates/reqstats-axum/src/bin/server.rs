//! reqstats demo server.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! configured stats backend, and serves `/stats` with every request recorded.
//!
//! ```toml
//! host  = "127.0.0.1"
//! port  = 8000
//! debug = true
//! ```

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use reqstats_axum::{Backend, StatsConfig, StatsState, config};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Request statistics demo server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

/// Listener settings, read from the same source as [`StatsConfig`].
#[derive(Deserialize)]
struct ListenConfig {
  #[serde(default = "default_host")]
  host: String,
  #[serde(default = "default_port")]
  port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8000 }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::settings(&cli.config).context("failed to read config file")?;
  let listen: ListenConfig = settings
    .clone()
    .try_deserialize()
    .context("failed to deserialise listener settings")?;
  let stats_cfg: StatsConfig = settings
    .try_deserialize()
    .context("failed to deserialise StatsConfig")?;

  let backend_cfg = stats_cfg.backend().context("invalid backend configuration")?;
  let backend = Backend::connect(&backend_cfg)
    .await
    .context("failed to open stats backend")?;

  let state = StatsState::from_config(Arc::new(backend), &stats_cfg);
  let app = reqstats_axum::with_stats(reqstats_axum::demo_routes(), state)
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", listen.host, listen.port);

  tracing::info!(policy = ?stats_cfg.policy, debug = stats_cfg.debug, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .await
    .context("server error")?;

  Ok(())
}
