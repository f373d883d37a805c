//! PostgreSQL backend for request statistics.
//!
//! Connections come from a process-wide [`deadpool_postgres`] pool; each
//! recorded request checks out one client for the duration of its
//! transaction.

mod schema;
mod store;

pub mod config;
pub mod error;

pub use config::PostgresConfig;
pub use error::{Error, Result};
pub use store::PostgresStore;
