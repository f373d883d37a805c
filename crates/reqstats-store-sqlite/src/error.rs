//! Error type for `reqstats-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored processing time below zero; the table was written by
  /// something other than this crate.
  #[error("negative processing time: {0}us")]
  NegativeDuration(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
