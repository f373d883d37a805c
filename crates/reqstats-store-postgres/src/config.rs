//! Connection settings for the production backend.

use std::time::Duration;

use serde::Deserialize;
use tokio_postgres::config::SslMode;

/// Where and how to reach the PostgreSQL server.
#[derive(Clone, Deserialize)]
pub struct PostgresConfig {
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  pub user:                 String,
  pub password:             String,
  /// Database name.
  pub name:                 String,
  /// `disable`, `prefer` or `require`; anything else means `prefer`.
  #[serde(default = "default_sslmode")]
  pub sslmode:              String,
  #[serde(default = "default_max_connections")]
  pub max_connections:      usize,
  #[serde(default = "default_connect_timeout")]
  pub connect_timeout_secs: u64,
}

fn default_port() -> u16 { 5432 }

fn default_sslmode() -> String { "disable".to_string() }

fn default_max_connections() -> usize { 16 }

fn default_connect_timeout() -> u64 { 30 }

impl PostgresConfig {
  /// Build the driver configuration for these settings.
  pub fn pg_config(&self) -> tokio_postgres::Config {
    let ssl_mode = match self.sslmode.to_lowercase().as_str() {
      "disable" => SslMode::Disable,
      "require" => SslMode::Require,
      _ => SslMode::Prefer,
    };

    let mut pg = tokio_postgres::Config::new();
    pg.host(&self.host)
      .port(self.port)
      .user(&self.user)
      .password(&self.password)
      .dbname(&self.name)
      .ssl_mode(ssl_mode)
      .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
      .keepalives(true);
    pg
  }
}

// Keep the password out of logs.
impl std::fmt::Debug for PostgresConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PostgresConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("user", &self.user)
      .field("password", &"***")
      .field("name", &self.name)
      .field("sslmode", &self.sslmode)
      .field("max_connections", &self.max_connections)
      .field("connect_timeout_secs", &self.connect_timeout_secs)
      .finish()
  }
}
