//! Error types for `reqstats-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// `on_response_end` ran for a context that never saw `on_request_start`.
  #[error("request context has no start time; on_request_start was not called")]
  MissingStartTime,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
