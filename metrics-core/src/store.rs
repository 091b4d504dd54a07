use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::Metric;

/// Uniform storage contract implemented by the memory, SQL, and
/// file-synced backends. Handlers and syncers depend only on this
/// trait, never on a concrete backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// Apply one metric update, returning the post-aggregation value
    /// (Counter: running sum, Gauge: stored value).
    async fn update(&self, metric: Metric) -> Result<Metric, StoreError>;

    /// Apply a sequence of updates: atomic as a unit on the SQL backend,
    /// per-item atomic in sequence on memory.
    async fn update_batch(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, StoreError>;

    /// Look up the current value for `id`/`kind`; `kind`'s payload is
    /// ignored on input and filled in on output.
    async fn read(&self, id: &str, kind: crate::model::MetricType) -> Result<Metric, StoreError>;

    async fn get_counters(&self) -> Result<HashMap<String, i64>, StoreError>;

    async fn get_gauges(&self) -> Result<HashMap<String, f64>, StoreError>;

    async fn ping(&self) -> bool;

    async fn close(&self);
}
