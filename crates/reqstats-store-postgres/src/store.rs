//! [`PostgresStore`]: the PostgreSQL implementation of [`StatsStore`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime, Transaction};
use tokio_postgres::{NoTls, Row, types::ToSql};

use reqstats_core::{
  DimensionId, DimensionIds, DimensionKind, Dimensions, FactId, NewRequestRecord,
  ReqRespInfo, StatsStore,
};

use crate::{
  Error, PostgresConfig, Result,
  schema::{INSERT_FACT, SCHEMA, SELECT_FACT},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A stats store backed by a pooled PostgreSQL connection set.
///
/// Cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct PostgresStore {
  pool: Pool,
}

impl PostgresStore {
  /// Build the pool, check that the server answers, and create the schema.
  pub async fn connect(config: &PostgresConfig) -> Result<Self> {
    tracing::info!(host = %config.host, db = %config.name, "connecting to postgres");

    let manager = Manager::from_config(
      config.pg_config(),
      NoTls,
      ManagerConfig { recycling_method: RecyclingMethod::Fast },
    );
    let pool = Pool::builder(manager)
      .max_size(config.max_connections)
      .runtime(Runtime::Tokio1)
      .build()
      .map_err(|e| Error::Build(e.to_string()))?;

    let store = Self { pool };
    store.init_schema().await?;

    tracing::info!(max_connections = config.max_connections, "postgres pool ready");
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let client = self.pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    Ok(())
  }

  async fn select_one(
    &self,
    clause: &str,
    params: &[&(dyn ToSql + Sync)],
  ) -> Result<Option<ReqRespInfo>> {
    let client = self.pool.get().await?;
    let sql = format!("{SELECT_FACT} {clause}");
    let row = client.query_opt(sql.as_str(), params).await?;
    row.as_ref().map(info_from_row).transpose()
  }
}

/// Get-or-create `text` in the `kind` table inside an open transaction.
///
/// Under `READ COMMITTED` a concurrent insert of the same text blocks on the
/// unique index until the other transaction finishes; the follow-up
/// `SELECT` then sees the committed row.
async fn resolve(
  tx: &Transaction<'_>,
  kind: DimensionKind,
  text: &str,
) -> Result<DimensionId> {
  let table = kind.table();

  let insert =
    format!("INSERT INTO {table} (text) VALUES ($1) ON CONFLICT (text) DO NOTHING RETURNING id");
  if let Some(row) = tx.query_opt(insert.as_str(), &[&text]).await? {
    return Ok(row.get(0));
  }

  let select = format!("SELECT id FROM {table} WHERE text = $1");
  let row = tx.query_one(select.as_str(), &[&text]).await?;
  Ok(row.get(0))
}

fn info_from_row(row: &Row) -> Result<ReqRespInfo> {
  let processed: i64 = row.get("processed");
  let content_length: Option<i64> = row.get("contentlength");
  let date: DateTime<Utc> = row.get("date");

  Ok(ReqRespInfo {
    id: row.get("id"),
    date,
    processed: decode_duration(processed)?,
    dimensions: Dimensions {
      user_agent:   row.get("useragent"),
      uri:          row.get("uri"),
      method:       row.get("method"),
      ip:           row.get("ip"),
      content_type: row.get("contenttype"),
      status:       row.get("httpstatus"),
    },
    dimension_ids: DimensionIds {
      user_agent:   row.get("useragent_id"),
      uri:          row.get("uri_id"),
      method:       row.get("method_id"),
      ip:           row.get("ip_id"),
      content_type: row.get("content_type_id"),
      status:       row.get("status_id"),
    },
    content_length: content_length.and_then(|n| u64::try_from(n).ok()),
  })
}

fn encode_duration(d: Duration) -> i64 { i64::try_from(d.as_micros()).unwrap_or(i64::MAX) }

fn decode_duration(micros: i64) -> Result<Duration> {
  u64::try_from(micros)
    .map(Duration::from_micros)
    .map_err(|_| Error::NegativeDuration(micros))
}

// ─── StatsStore impl ─────────────────────────────────────────────────────────

impl StatsStore for PostgresStore {
  type Error = Error;

  async fn get_or_create(&self, kind: DimensionKind, text: &str) -> Result<DimensionId> {
    let text = kind.normalize(text);
    let mut client = self.pool.get().await?;
    let tx = client.transaction().await?;
    let id = resolve(&tx, kind, text).await?;
    tx.commit().await?;
    Ok(id)
  }

  async fn dimension_count(&self, kind: DimensionKind, text: &str) -> Result<u64> {
    let text = kind.normalize(text);
    let client = self.pool.get().await?;
    let sql = format!("SELECT COUNT(*) FROM {} WHERE text = $1", kind.table());
    let row = client.query_one(sql.as_str(), &[&text]).await?;
    let count: i64 = row.get(0);
    Ok(count.max(0) as u64)
  }

  async fn record_request(&self, record: NewRequestRecord) -> Result<ReqRespInfo> {
    let dimensions = record.dimensions.normalized();
    let micros     = encode_duration(record.processed);
    let length     = record.content_length.map(|n| i64::try_from(n).unwrap_or(i64::MAX));

    // The pooled client goes back to the pool when `client` drops, on every
    // path. An uncommitted `tx` rolls back on drop.
    let mut client = self.pool.get().await?;
    let tx = client.transaction().await?;

    let mut ids = DimensionIds::default();
    for (kind, text) in dimensions.iter() {
      ids.set(kind, resolve(&tx, kind, text).await?);
    }

    let row = tx
      .query_one(INSERT_FACT, &[
        &record.date,
        &micros,
        &ids.user_agent,
        &ids.uri,
        &ids.method,
        &ids.ip,
        &ids.content_type,
        &ids.status,
        &length,
      ])
      .await?;
    let id: FactId = row.get(0);

    tx.commit().await?;

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

  async fn get(&self, id: FactId) -> Result<Option<ReqRespInfo>> {
    self.select_one("WHERE s.id = $1", &[&id]).await
  }

  async fn latest(&self) -> Result<Option<ReqRespInfo>> {
    self.select_one("ORDER BY s.id DESC LIMIT 1", &[]).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duration_is_stored_in_microseconds() {
    assert_eq!(encode_duration(Duration::from_millis(3)), 3_000);
    assert_eq!(decode_duration(3_000).unwrap(), Duration::from_millis(3));
  }

  #[test]
  fn negative_duration_is_rejected() {
    assert!(matches!(decode_duration(-10), Err(Error::NegativeDuration(-10))));
  }
}
