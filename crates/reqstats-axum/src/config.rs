//! Middleware configuration, deserialised from TOML and the environment.
//!
//! ```toml
//! debug  = false
//! policy = "strict"
//!
//! [database]
//! host     = "localhost"
//! user     = "stats"
//! password = "secret"
//! name     = "stats"
//! ```

use std::path::{Path, PathBuf};

use reqstats_core::RecordingPolicy;
use reqstats_store_postgres::PostgresConfig;
use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variables with this prefix override file values, e.g.
/// `REQSTATS_DATABASE__HOST`.
pub const ENV_PREFIX: &str = "REQSTATS";

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
  /// Record into the debug backend instead of `[database]`.
  #[serde(default)]
  pub debug:          bool,
  #[serde(default)]
  pub policy:         RecordingPolicy,
  /// Scheme recorded when neither the request URI nor `X-Forwarded-Proto`
  /// carries one.
  #[serde(default = "default_scheme")]
  pub default_scheme: String,
  pub database:       Option<PostgresConfig>,
  #[serde(default)]
  pub debug_backend:  DebugBackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebugBackendConfig {
  /// SQLite file, or `:memory:`.
  #[serde(default = "default_debug_path")]
  pub path: PathBuf,
}

impl Default for DebugBackendConfig {
  fn default() -> Self { Self { path: default_debug_path() } }
}

fn default_scheme() -> String { "http".to_string() }

fn default_debug_path() -> PathBuf { PathBuf::from(":memory:") }

/// Raw layered settings: `path` (optional) under `REQSTATS_*` environment
/// variables. Hosts embedding the middleware can deserialise their own keys
/// from the same source.
pub fn settings(path: &Path) -> Result<config::Config, ConfigError> {
  Ok(
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
      .build()?,
  )
}

/// The backend selected by [`StatsConfig::backend`].
#[derive(Debug, Clone)]
pub enum BackendConfig {
  Debug { path: PathBuf },
  Database(PostgresConfig),
}

impl StatsConfig {
  /// Read `path` (optional) layered under `REQSTATS_*` environment variables.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Ok(settings(path)?.try_deserialize()?)
  }

  /// Pick the backend. The two modes are mutually exclusive: in debug mode
  /// `[database]` is ignored, otherwise it is required.
  pub fn backend(&self) -> Result<BackendConfig, ConfigError> {
    if self.debug {
      if self.database.is_some() {
        tracing::warn!("debug mode enabled; ignoring [database] settings");
      }
      return Ok(BackendConfig::Debug { path: self.debug_backend.path.clone() });
    }
    self
      .database
      .clone()
      .map(BackendConfig::Database)
      .ok_or(ConfigError::MissingDatabase)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> StatsConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn production_settings_select_database() {
    let cfg = parse(
      r#"
      [database]
      host     = "db"
      user     = "stats"
      password = "secret"
      name     = "requests"
      "#,
    );
    assert!(!cfg.debug);
    assert_eq!(cfg.policy, RecordingPolicy::Strict);
    assert_eq!(cfg.default_scheme, "http");

    match cfg.backend().unwrap() {
      BackendConfig::Database(db) => {
        assert_eq!(db.host, "db");
        assert_eq!(db.port, 5432);
        assert_eq!(db.name, "requests");
      }
      other => panic!("expected database backend, got {other:?}"),
    }
  }

  #[test]
  fn debug_mode_ignores_database() {
    let cfg = parse(
      r#"
      debug  = true
      policy = "lenient"

      [database]
      host     = "db"
      user     = "stats"
      password = "secret"
      name     = "requests"
      "#,
    );
    assert_eq!(cfg.policy, RecordingPolicy::Lenient);
    assert!(matches!(
      cfg.backend().unwrap(),
      BackendConfig::Debug { path } if path == Path::new(":memory:")
    ));
  }

  #[test]
  fn production_without_database_is_rejected() {
    let cfg = parse("debug = false");
    assert!(matches!(cfg.backend(), Err(ConfigError::MissingDatabase)));
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let cfg = StatsConfig::load(Path::new("/nonexistent/reqstats.toml"));
    assert!(cfg.is_ok());
  }
}
