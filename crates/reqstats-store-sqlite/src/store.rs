//! [`SqliteStore`]: the SQLite implementation of [`StatsStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use reqstats_core::{
  DimensionId, DimensionIds, DimensionKind, FactId, NewRequestRecord, ReqRespInfo,
  StatsStore,
};

use crate::{
  Result,
  encode::{RawFact, decode_duration, encode_dt, encode_duration, encode_length},
  schema::{SCHEMA, SELECT_FACT},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A stats store backed by a single SQLite database.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one background connection thread, which also serialises every unit
/// of work.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn select_one(&self, clause: &'static str, id: Option<FactId>) -> Result<Option<ReqRespInfo>> {
    let raw: Option<RawFact> = self
      .conn
      .call(move |conn| {
        let sql = format!("{SELECT_FACT} {clause}");
        let mut stmt = conn.prepare_cached(&sql)?;
        let raw = match id {
          Some(id) => stmt.query_row(rusqlite::params![id], RawFact::from_row),
          None => stmt.query_row([], RawFact::from_row),
        }
        .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawFact::into_info).transpose()
  }
}

/// Get-or-create `text` in the `kind` table on an open connection or
/// transaction.
///
/// `INSERT … ON CONFLICT DO NOTHING` against the `UNIQUE` constraint followed
/// by a re-select: no interleaving of callers can produce a duplicate row.
fn resolve(
  conn: &rusqlite::Connection,
  kind: DimensionKind,
  text: &str,
) -> rusqlite::Result<DimensionId> {
  let table = kind.table();
  conn
    .prepare_cached(&format!(
      "INSERT INTO {table} (text) VALUES (?1) ON CONFLICT (text) DO NOTHING"
    ))?
    .execute([text])?;
  conn
    .prepare_cached(&format!("SELECT id FROM {table} WHERE text = ?1"))?
    .query_row([text], |r| r.get(0))
}

// ─── StatsStore impl ─────────────────────────────────────────────────────────

impl StatsStore for SqliteStore {
  type Error = crate::Error;

  // ── Dimensions ────────────────────────────────────────────────────────────

  async fn get_or_create(&self, kind: DimensionKind, text: &str) -> Result<DimensionId> {
    let text = kind.normalize(text).to_owned();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = resolve(&tx, kind, &text)?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(id)
  }

  async fn dimension_count(&self, kind: DimensionKind, text: &str) -> Result<u64> {
    let text = kind.normalize(text).to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE text = ?1", kind.table());
        Ok(conn.query_row(&sql, [text], |r| r.get(0))?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn record_request(&self, record: NewRequestRecord) -> Result<ReqRespInfo> {
    let dimensions = record.dimensions.normalized();
    let date_str   = encode_dt(record.date);
    let micros     = encode_duration(record.processed);
    let length     = encode_length(record.content_length);
    let dims       = dimensions.clone();

    // One transaction per request: dimensions and fact commit together or
    // not at all. Dropping `tx` on an early `?` rolls back.
    let (id, ids) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let mut ids = DimensionIds::default();
        for (kind, text) in dims.iter() {
          ids.set(kind, resolve(&tx, kind, text)?);
        }

        tx.execute(
          "INSERT INTO stats (
             date, processed,
             useragent_id, uri_id, method_id, ip_id, content_type_id, status_id,
             contentlength
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            date_str,
            micros,
            ids.user_agent,
            ids.uri,
            ids.method,
            ids.ip,
            ids.content_type,
            ids.status,
            length,
          ],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok((id, ids))
      })
      .await?;

    tracing::debug!(fact_id = id, method = %dimensions.method, status = %dimensions.status, "stored request");

    Ok(ReqRespInfo {
      id,
      date: record.date,
      processed: decode_duration(micros)?,
      dimensions,
      dimension_ids: ids,
      content_length: record.content_length,
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(&self, id: FactId) -> Result<Option<ReqRespInfo>> {
    self.select_one("WHERE s.id = ?1", Some(id)).await
  }

  async fn latest(&self) -> Result<Option<ReqRespInfo>> {
    self.select_one("ORDER BY s.id DESC LIMIT 1", None).await
  }
}
