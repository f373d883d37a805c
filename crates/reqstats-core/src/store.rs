//! The `StatsStore` trait.
//!
//! The trait is implemented by storage backends (`reqstats-store-sqlite`,
//! `reqstats-store-postgres`). The interceptor and the framework adapters
//! depend on this abstraction, never on a concrete backend.

use std::future::Future;

use crate::{
  dimension::{DimensionId, DimensionKind},
  record::{FactId, NewRequestRecord, ReqRespInfo},
};

/// Abstraction over a request-statistics backend.
///
/// Dimension rows are get-or-create and fact rows are append-only. Every
/// method returns `Send` futures so a store can be shared across a
/// multi-threaded runtime.
pub trait StatsStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Dimensions ────────────────────────────────────────────────────────

  /// Return the id of the `kind` row whose text equals `text`, inserting it
  /// first if it does not exist.
  ///
  /// Safe under concurrent callers: exactly one row exists afterwards and all
  /// callers observe the same id. Runs in its own transaction.
  fn get_or_create<'a>(
    &'a self,
    kind: DimensionKind,
    text: &'a str,
  ) -> impl Future<Output = Result<DimensionId, Self::Error>> + Send + 'a;

  /// Number of `kind` rows holding exactly `text` (0 or 1).
  fn dimension_count<'a>(
    &'a self,
    kind: DimensionKind,
    text: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// Resolve all six dimensions and insert one fact row, atomically.
  ///
  /// Either everything is committed or nothing is: a failure at any step
  /// rolls back dimension rows created along the way.
  fn record_request(
    &self,
    record: NewRequestRecord,
  ) -> impl Future<Output = Result<ReqRespInfo, Self::Error>> + Send + '_;

  /// Fetch a single fact by id.
  fn get(
    &self,
    id: FactId,
  ) -> impl Future<Output = Result<Option<ReqRespInfo>, Self::Error>> + Send + '_;

  /// Fetch the fact with the highest id.
  fn latest(
    &self,
  ) -> impl Future<Output = Result<Option<ReqRespInfo>, Self::Error>> + Send + '_;
}
