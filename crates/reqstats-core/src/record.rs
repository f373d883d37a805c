//! Fact types. One immutable row per recorded request.
//!
//! A fact references each of the six dimension tables by id and carries the
//! completion timestamp, the processing time and the request body length.
//! Facts are never updated or deleted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dimension::{DimensionIds, Dimensions};

/// Surrogate identifier of a fact row; assigned by the store.
pub type FactId = i64;

// ─── NewRequestRecord ────────────────────────────────────────────────────────

/// Input to [`crate::store::StatsStore::record_request`].
///
/// Holds raw dimension text; the store resolves every value to a dimension id
/// inside the same unit of work as the fact insert.
#[derive(Debug, Clone)]
pub struct NewRequestRecord {
  /// When the response completed (server clock).
  pub date:           DateTime<Utc>,
  /// Time between request start and response completion.
  pub processed:      Duration,
  pub dimensions:     Dimensions,
  /// `None` when the request carried no body.
  pub content_length: Option<u64>,
}

// ─── ReqRespInfo ─────────────────────────────────────────────────────────────

/// A persisted fact with every dimension joined back to its text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReqRespInfo {
  pub id:             FactId,
  pub date:           DateTime<Utc>,
  pub processed:      Duration,
  pub dimensions:     Dimensions,
  pub dimension_ids:  DimensionIds,
  pub content_length: Option<u64>,
}

impl ReqRespInfo {
  /// Processing time in fractional milliseconds.
  pub fn processed_ms(&self) -> f64 { self.processed.as_secs_f64() * 1000.0 }
}
