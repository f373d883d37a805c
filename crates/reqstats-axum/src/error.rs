//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

/// A recording failure surfaced to the host under the strict policy.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to record request: {0}")]
  Recording(#[from] reqstats_core::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Recording(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
      }
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read configuration: {0}")]
  Load(#[from] config::ConfigError),

  #[error("`debug = false` requires a [database] section")]
  MissingDatabase,
}

/// Errors from whichever backend [`crate::backend::Backend`] wraps.
#[derive(Debug, Error)]
pub enum BackendError {
  #[error("sqlite: {0}")]
  Sqlite(#[from] reqstats_store_sqlite::Error),

  #[error("postgres: {0}")]
  Postgres(#[from] reqstats_store_postgres::Error),
}
