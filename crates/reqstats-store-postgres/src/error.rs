//! Error type for `reqstats-store-postgres`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_postgres::Error),

  #[error("connection pool error: {0}")]
  Pool(#[from] deadpool_postgres::PoolError),

  #[error("failed to build connection pool: {0}")]
  Build(String),

  #[error("negative processing time: {0}us")]
  NegativeDuration(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
