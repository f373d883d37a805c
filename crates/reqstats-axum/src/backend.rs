//! Runtime selection between the debug and production stores.

use reqstats_core::{
  DimensionId, DimensionKind, FactId, NewRequestRecord, ReqRespInfo, StatsStore,
};
use reqstats_store_postgres::PostgresStore;
use reqstats_store_sqlite::SqliteStore;

use crate::{config::BackendConfig, error::BackendError};

/// Whichever store the configuration selected.
#[derive(Clone)]
pub enum Backend {
  Sqlite(SqliteStore),
  Postgres(PostgresStore),
}

impl Backend {
  /// Open the store described by `config` and create its schema.
  pub async fn connect(config: &BackendConfig) -> Result<Self, BackendError> {
    match config {
      BackendConfig::Debug { path } if path.as_os_str() == ":memory:" => {
        tracing::info!("recording into in-memory sqlite");
        Ok(Self::Sqlite(SqliteStore::open_in_memory().await?))
      }
      BackendConfig::Debug { path } => {
        tracing::info!(path = %path.display(), "recording into sqlite");
        Ok(Self::Sqlite(SqliteStore::open(path).await?))
      }
      BackendConfig::Database(db) => Ok(Self::Postgres(PostgresStore::connect(db).await?)),
    }
  }
}

impl StatsStore for Backend {
  type Error = BackendError;

  async fn get_or_create(&self, kind: DimensionKind, text: &str) -> Result<DimensionId, BackendError> {
    Ok(match self {
      Self::Sqlite(s) => s.get_or_create(kind, text).await?,
      Self::Postgres(s) => s.get_or_create(kind, text).await?,
    })
  }

  async fn dimension_count(&self, kind: DimensionKind, text: &str) -> Result<u64, BackendError> {
    Ok(match self {
      Self::Sqlite(s) => s.dimension_count(kind, text).await?,
      Self::Postgres(s) => s.dimension_count(kind, text).await?,
    })
  }

  async fn record_request(&self, record: NewRequestRecord) -> Result<ReqRespInfo, BackendError> {
    Ok(match self {
      Self::Sqlite(s) => s.record_request(record).await?,
      Self::Postgres(s) => s.record_request(record).await?,
    })
  }

  async fn get(&self, id: FactId) -> Result<Option<ReqRespInfo>, BackendError> {
    Ok(match self {
      Self::Sqlite(s) => s.get(id).await?,
      Self::Postgres(s) => s.get(id).await?,
    })
  }

  async fn latest(&self) -> Result<Option<ReqRespInfo>, BackendError> {
    Ok(match self {
      Self::Sqlite(s) => s.latest().await?,
      Self::Postgres(s) => s.latest().await?,
    })
  }
}
