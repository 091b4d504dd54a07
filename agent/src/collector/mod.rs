pub mod host_sampler;
pub mod process_stats;
pub mod runtime_sampler;

use std::collections::HashMap;
use std::sync::Arc;

use metrics_core::model::Metric;
use tokio::sync::RwLock;

use host_sampler::HostSampler;
use runtime_sampler::{RuntimeSampler, UnknownMetric};

/// Shared collector state: a single reader/writer lock over both the
/// gauges and the poll counter.
pub struct AgentMetrics {
    inner: RwLock<Inner>,
}

struct Inner {
    gauges: HashMap<String, f64>,
    poll_count: i64,
}

impl AgentMetrics {
    pub fn new() -> Result<(Arc<Self>, RuntimeSampler, HostSampler), UnknownMetric> {
        let runtime_sampler = RuntimeSampler::new()?;
        let host_sampler = HostSampler::new();
        let state = Arc::new(Self {
            inner: RwLock::new(Inner {
                gauges: HashMap::new(),
                poll_count: 0,
            }),
        });
        Ok((state, runtime_sampler, host_sampler))
    }

    /// One poll tick: samples runtime and host gauges, merges them in,
    /// and increments `PollCount`.
    pub async fn poll(&self, runtime_sampler: &mut RuntimeSampler, host_sampler: &mut HostSampler) {
        let runtime_gauges = runtime_sampler.sample();
        let host_gauges = host_sampler.sample();

        let mut inner = self.inner.write().await;
        inner.gauges.extend(runtime_gauges);
        inner.gauges.extend(host_gauges);
        inner.poll_count += 1;
    }

    /// Snapshot for a report tick: every gauge plus `PollCount`.
    pub async fn snapshot(&self) -> Vec<Metric> {
        let inner = self.inner.read().await;
        let mut metrics: Vec<Metric> = inner
            .gauges
            .iter()
            .map(|(id, value)| Metric::gauge(id.clone(), *value))
            .collect();
        metrics.push(Metric::counter("PollCount", inner.poll_count));
        metrics
    }

    /// Resets `PollCount` to zero after a batch has been acknowledged,
    /// regardless of which transport sent it.
    pub async fn reset_poll_count(&self) {
        self.inner.write().await.poll_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poll_increments_count_and_populates_gauges() {
        let (state, mut runtime_sampler, mut host_sampler) = AgentMetrics::new().unwrap();
        state.poll(&mut runtime_sampler, &mut host_sampler).await;
        state.poll(&mut runtime_sampler, &mut host_sampler).await;

        let snapshot = state.snapshot().await;
        let poll_count = snapshot
            .iter()
            .find(|m| m.id == "PollCount")
            .expect("PollCount must be present");
        assert_eq!(poll_count.kind, metrics_core::model::MetricKind::Counter(2));
    }

    #[tokio::test]
    async fn reset_zeroes_poll_count_without_touching_gauges() {
        let (state, mut runtime_sampler, mut host_sampler) = AgentMetrics::new().unwrap();
        state.poll(&mut runtime_sampler, &mut host_sampler).await;
        state.reset_poll_count().await;

        let snapshot = state.snapshot().await;
        let poll_count = snapshot.iter().find(|m| m.id == "PollCount").unwrap();
        assert_eq!(poll_count.kind, metrics_core::model::MetricKind::Counter(0));
        assert!(snapshot.len() > 1, "gauges must survive the reset");
    }
}
