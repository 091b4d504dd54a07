use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use metrics_core::error::StoreError;
use metrics_core::model::{Metric, MetricKind, MetricType};
use metrics_core::store::Store;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const STATEMENT_TIMEOUT: Duration = Duration::from_secs(3);

/// SQL-backed store. Two tables (`counters`, `gauges`) created
/// idempotently at construction; every statement runs under a 3-second
/// timeout.
pub struct SqlStore {
    pool: PgPool,
}

impl SqlStore {
    pub async fn connect(dsn: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(10).connect(dsn).await?;
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), sqlx::Error> {
        with_timeout(
            sqlx::query("CREATE TABLE IF NOT EXISTS counters(id text primary key, delta bigint)")
                .execute(&self.pool),
        )
        .await?;
        with_timeout(
            sqlx::query("CREATE TABLE IF NOT EXISTS gauges(id text primary key, val double precision)")
                .execute(&self.pool),
        )
        .await?;
        info!("counters/gauges tables ensured");
        Ok(())
    }

    async fn update_one(&self, metric: Metric) -> Result<Metric, StoreError> {
        match metric.kind {
            MetricKind::Counter(delta) => {
                let row: (i64,) = with_timeout(
                    sqlx::query_as(
                        "INSERT INTO counters(id, delta) VALUES($1, $2)
                         ON CONFLICT(id) DO UPDATE SET delta = counters.delta + EXCLUDED.delta
                         RETURNING delta",
                    )
                    .bind(&metric.id)
                    .bind(delta)
                    .fetch_one(&self.pool),
                )
                .await
                .map_err(|e| StoreError::Backend(e.into()))?;
                Ok(Metric::counter(metric.id, row.0))
            }
            MetricKind::Gauge(value) => {
                let row: (f64,) = with_timeout(
                    sqlx::query_as(
                        "INSERT INTO gauges(id, val) VALUES($1, $2)
                         ON CONFLICT(id) DO UPDATE SET val = EXCLUDED.val
                         RETURNING val",
                    )
                    .bind(&metric.id)
                    .bind(value)
                    .fetch_one(&self.pool),
                )
                .await
                .map_err(|e| StoreError::Backend(e.into()))?;
                Ok(Metric::gauge(metric.id, row.0))
            }
        }
    }
}

async fn with_timeout<T, E>(fut: impl std::future::Future<Output = Result<T, E>>) -> Result<T, E>
where
    E: From<TimeoutElapsed>,
{
    match tokio::time::timeout(STATEMENT_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutElapsed.into()),
    }
}

#[derive(Debug)]
struct TimeoutElapsed;

impl std::fmt::Display for TimeoutElapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "statement timed out after {STATEMENT_TIMEOUT:?}")
    }
}

impl std::error::Error for TimeoutElapsed {}

impl From<TimeoutElapsed> for sqlx::Error {
    fn from(e: TimeoutElapsed) -> Self {
        sqlx::Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, e.to_string()))
    }
}

#[async_trait]
impl Store for SqlStore {
    async fn update(&self, metric: Metric) -> Result<Metric, StoreError> {
        self.update_one(metric).await
    }

    async fn update_batch(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, StoreError> {
        // Atomic as a unit: run every upsert inside a single transaction.
        let mut tx = self.pool.begin().await.map_err(|e| StoreError::Backend(e.into()))?;
        let mut out = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let result = match metric.kind {
                MetricKind::Counter(delta) => {
                    let row: (i64,) = sqlx::query_as(
                        "INSERT INTO counters(id, delta) VALUES($1, $2)
                         ON CONFLICT(id) DO UPDATE SET delta = counters.delta + EXCLUDED.delta
                         RETURNING delta",
                    )
                    .bind(&metric.id)
                    .bind(delta)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| StoreError::Backend(e.into()))?;
                    Metric::counter(metric.id, row.0)
                }
                MetricKind::Gauge(value) => {
                    let row: (f64,) = sqlx::query_as(
                        "INSERT INTO gauges(id, val) VALUES($1, $2)
                         ON CONFLICT(id) DO UPDATE SET val = EXCLUDED.val
                         RETURNING val",
                    )
                    .bind(&metric.id)
                    .bind(value)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| StoreError::Backend(e.into()))?;
                    Metric::gauge(metric.id, row.0)
                }
            };
            out.push(result);
        }
        tx.commit().await.map_err(|e| StoreError::Backend(e.into()))?;
        Ok(out)
    }

    async fn read(&self, id: &str, kind: MetricType) -> Result<Metric, StoreError> {
        match kind {
            MetricType::Counter => {
                let row: Option<(i64,)> = with_timeout(
                    sqlx::query_as("SELECT delta FROM counters WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool),
                )
                .await
                .map_err(|e| StoreError::Backend(e.into()))?;
                row.map(|(delta,)| Metric::counter(id, delta)).ok_or(StoreError::NotFound)
            }
            MetricType::Gauge => {
                let row: Option<(f64,)> = with_timeout(
                    sqlx::query_as("SELECT val FROM gauges WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool),
                )
                .await
                .map_err(|e| StoreError::Backend(e.into()))?;
                row.map(|(val,)| Metric::gauge(id, val)).ok_or(StoreError::NotFound)
            }
        }
    }

    async fn get_counters(&self) -> Result<HashMap<String, i64>, StoreError> {
        let rows: Vec<(String, i64)> = with_timeout(sqlx::query_as("SELECT id, delta FROM counters").fetch_all(&self.pool))
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(rows.into_iter().collect())
    }

    async fn get_gauges(&self) -> Result<HashMap<String, f64>, StoreError> {
        let rows: Vec<(String, f64)> = with_timeout(sqlx::query_as("SELECT id, val FROM gauges").fetch_all(&self.pool))
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(rows.into_iter().collect())
    }

    async fn ping(&self) -> bool {
        tokio::time::timeout(STATEMENT_TIMEOUT, self.pool.acquire())
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// Exercised only against a live Postgres instance; see tests/sql_store.rs,
// which is `#[ignore]`d unless DATABASE_URL is set.
