use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use metrics_core::error::StoreError;
use metrics_core::model::{Metric, MetricKind, MetricType};
use metrics_core::store::Store;
use tokio::sync::RwLock;
use tracing::info;

use super::file_sync::FileSyncer;

/// In-memory backend: one reader/writer lock per kind. Optionally wraps
/// a `FileSyncer` that receives a signal on every successful write.
///
/// The syncer is attached after construction (`set_syncer`) since it
/// needs an `Arc<MemoryStore>` to restore into before it can exist
/// itself.
pub struct MemoryStore {
    counters: RwLock<HashMap<String, i64>>,
    gauges: RwLock<HashMap<String, f64>>,
    syncer: OnceLock<Arc<FileSyncer>>,
}

impl MemoryStore {
    pub fn new(syncer: Option<Arc<FileSyncer>>) -> Self {
        let cell = OnceLock::new();
        if let Some(s) = syncer {
            let _ = cell.set(s);
        }
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            syncer: cell,
        }
    }

    /// Attaches a syncer once the store has already been constructed,
    /// for the case where the syncer itself needed an `Arc<MemoryStore>`
    /// to restore a snapshot into before it could be built.
    pub fn set_syncer(&self, syncer: Arc<FileSyncer>) {
        let _ = self.syncer.set(syncer);
    }

    /// Used by the syncer's restore path to seed both maps from a
    /// previously persisted snapshot without going through `update`
    /// (which would re-trigger a sync signal).
    pub async fn load_snapshot(&self, metrics: Vec<Metric>) {
        let mut counters = self.counters.write().await;
        let mut gauges = self.gauges.write().await;
        for m in metrics {
            match m.kind {
                MetricKind::Counter(delta) => {
                    counters.insert(m.id, delta);
                }
                MetricKind::Gauge(value) => {
                    gauges.insert(m.id, value);
                }
            }
        }
    }

    fn signal_sync(&self) {
        if let Some(syncer) = self.syncer.get() {
            syncer.notify();
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn update(&self, metric: Metric) -> Result<Metric, StoreError> {
        let result = match metric.kind {
            MetricKind::Counter(delta) => {
                let mut counters = self.counters.write().await;
                let entry = counters.entry(metric.id.clone()).or_insert(0);
                *entry += delta;
                Metric::counter(metric.id, *entry)
            }
            MetricKind::Gauge(value) => {
                let mut gauges = self.gauges.write().await;
                gauges.insert(metric.id.clone(), value);
                Metric::gauge(metric.id, value)
            }
        };
        self.signal_sync();
        Ok(result)
    }

    async fn update_batch(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, StoreError> {
        let mut out = Vec::with_capacity(metrics.len());
        for m in metrics {
            // Applied in sequence; the syncer is signalled once after the
            // whole batch rather than per item.
            let result = match m.kind {
                MetricKind::Counter(delta) => {
                    let mut counters = self.counters.write().await;
                    let entry = counters.entry(m.id.clone()).or_insert(0);
                    *entry += delta;
                    Metric::counter(m.id, *entry)
                }
                MetricKind::Gauge(value) => {
                    let mut gauges = self.gauges.write().await;
                    gauges.insert(m.id.clone(), value);
                    Metric::gauge(m.id, value)
                }
            };
            out.push(result);
        }
        self.signal_sync();
        Ok(out)
    }

    async fn read(&self, id: &str, kind: MetricType) -> Result<Metric, StoreError> {
        match kind {
            MetricType::Counter => {
                let counters = self.counters.read().await;
                counters
                    .get(id)
                    .map(|v| Metric::counter(id, *v))
                    .ok_or(StoreError::NotFound)
            }
            MetricType::Gauge => {
                let gauges = self.gauges.read().await;
                gauges
                    .get(id)
                    .map(|v| Metric::gauge(id, *v))
                    .ok_or(StoreError::NotFound)
            }
        }
    }

    async fn get_counters(&self) -> Result<HashMap<String, i64>, StoreError> {
        Ok(self.counters.read().await.clone())
    }

    async fn get_gauges(&self) -> Result<HashMap<String, f64>, StoreError> {
        Ok(self.gauges.read().await.clone())
    }

    async fn ping(&self) -> bool {
        false
    }

    async fn close(&self) {
        if let Some(syncer) = self.syncer.get() {
            info!("draining file syncer before shutdown");
            syncer.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counter_sums_deltas() {
        let store = MemoryStore::new(None);
        store.update(Metric::counter("c0", 3)).await.unwrap();
        let updated = store.update(Metric::counter("c0", 4)).await.unwrap();
        assert_eq!(updated, Metric::counter("c0", 7));
        let read = store.read("c0", MetricType::Counter).await.unwrap();
        assert_eq!(read, Metric::counter("c0", 7));
    }

    #[tokio::test]
    async fn gauge_keeps_latest_value() {
        let store = MemoryStore::new(None);
        store.update(Metric::gauge("g0", 2.5)).await.unwrap();
        let updated = store.update(Metric::gauge("g0", 1.25)).await.unwrap();
        assert_eq!(updated, Metric::gauge("g0", 1.25));
    }

    #[tokio::test]
    async fn update_batch_matches_sequential_updates() {
        let batched = MemoryStore::new(None);
        batched
            .update_batch(vec![Metric::counter("c0", 1), Metric::gauge("g0", 64.0)])
            .await
            .unwrap();

        let sequential = MemoryStore::new(None);
        sequential.update(Metric::counter("c0", 1)).await.unwrap();
        sequential.update(Metric::gauge("g0", 64.0)).await.unwrap();

        assert_eq!(batched.get_counters().await.unwrap(), sequential.get_counters().await.unwrap());
        assert_eq!(batched.get_gauges().await.unwrap(), sequential.get_gauges().await.unwrap());
    }

    #[tokio::test]
    async fn read_unknown_id_is_not_found() {
        let store = MemoryStore::new(None);
        let err = store.read("missing", MetricType::Counter).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn get_counters_is_a_defensive_copy() {
        let store = MemoryStore::new(None);
        store.update(Metric::counter("c0", 1)).await.unwrap();
        let mut snapshot = store.get_counters().await.unwrap();
        snapshot.insert("c0".into(), 999);
        let fresh = store.get_counters().await.unwrap();
        assert_eq!(fresh["c0"], 1);
    }
}
