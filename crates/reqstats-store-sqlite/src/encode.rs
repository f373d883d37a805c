//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Processing times are stored as
//! whole microseconds. Content lengths are stored as signed integers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqstats_core::{DimensionIds, Dimensions, ReqRespInfo};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Duration ────────────────────────────────────────────────────────────────

/// Saturates at `i64::MAX` microseconds (~292k years).
pub fn encode_duration(d: Duration) -> i64 {
  i64::try_from(d.as_micros()).unwrap_or(i64::MAX)
}

pub fn decode_duration(micros: i64) -> Result<Duration> {
  u64::try_from(micros)
    .map(Duration::from_micros)
    .map_err(|_| Error::NegativeDuration(micros))
}

// ─── Content length ──────────────────────────────────────────────────────────

pub fn encode_length(n: Option<u64>) -> Option<i64> {
  n.map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}

pub fn decode_length(n: Option<i64>) -> Option<u64> {
  n.and_then(|n| u64::try_from(n).ok())
}

// ─── Raw row ─────────────────────────────────────────────────────────────────

/// A fact row exactly as returned by [`crate::schema::SELECT_FACT`].
pub struct RawFact {
  pub id:             i64,
  pub date:           String,
  pub processed:      i64,
  pub content_length: Option<i64>,
  pub ids:            DimensionIds,
  pub dimensions:     Dimensions,
}

impl RawFact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      date:           row.get(1)?,
      processed:      row.get(2)?,
      content_length: row.get(3)?,
      ids:            DimensionIds {
        user_agent:   row.get(4)?,
        uri:          row.get(6)?,
        method:       row.get(8)?,
        ip:           row.get(10)?,
        content_type: row.get(12)?,
        status:       row.get(14)?,
      },
      dimensions:     Dimensions {
        user_agent:   row.get(5)?,
        uri:          row.get(7)?,
        method:       row.get(9)?,
        ip:           row.get(11)?,
        content_type: row.get(13)?,
        status:       row.get(15)?,
      },
    })
  }

  pub fn into_info(self) -> Result<ReqRespInfo> {
    Ok(ReqRespInfo {
      id:             self.id,
      date:           decode_dt(&self.date)?,
      processed:      decode_duration(self.processed)?,
      dimensions:     self.dimensions,
      dimension_ids:  self.ids,
      content_length: decode_length(self.content_length),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duration_keeps_microseconds() {
    let d = Duration::from_nanos(1_234_567);
    assert_eq!(encode_duration(d), 1_234);
    assert_eq!(decode_duration(1_234).unwrap(), Duration::from_micros(1_234));
  }

  #[test]
  fn negative_duration_is_rejected() {
    assert!(matches!(decode_duration(-1), Err(Error::NegativeDuration(-1))));
  }

  #[test]
  fn dt_roundtrip_is_lossless() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }
}
