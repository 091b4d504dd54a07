use std::sync::Arc;
use std::time::Duration;

use metrics_core::model::Metric;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::transport::{Transport, TransportError};
use crate::collector::AgentMetrics;

/// Delays between the three retry attempts on transport failure.
const RETRY_DELAYS: [Duration; 3] = [Duration::from_secs(1), Duration::from_secs(3), Duration::from_secs(5)];

/// Bounded worker pool: `rate_limit` workers draining a job channel of
/// the same capacity, each retrying a batch through the retry schedule
/// before giving up. `PollCount` resets only once a batch has actually
/// been acknowledged by the server, regardless of which worker sent it.
pub struct SenderPool {
    job_tx: mpsc::Sender<Vec<Metric>>,
    workers: Vec<JoinHandle<()>>,
    logger: JoinHandle<()>,
}

impl SenderPool {
    pub fn start(rate_limit: usize, transport: Arc<dyn Transport>, metrics: Arc<AgentMetrics>, cancel: CancellationToken) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Vec<Metric>>(rate_limit);
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<Result<(), TransportError>>(rate_limit * 4);

        let mut workers = Vec::with_capacity(rate_limit);
        for id in 0..rate_limit {
            let job_rx = job_rx.clone();
            let transport = transport.clone();
            let metrics = metrics.clone();
            let result_tx = result_tx.clone();
            let cancel = cancel.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = job_rx.lock().await;
                        tokio::select! {
                            job = rx.recv() => job,
                            _ = cancel.cancelled() => None,
                        }
                    };
                    let Some(batch) = job else { break };
                    info!(worker = id, batch_len = batch.len(), "processing job with batch of metrics");
                    let result = send_with_retry(transport.as_ref(), &batch).await;
                    if result.is_ok() {
                        metrics.reset_poll_count().await;
                    }
                    let _ = result_tx.send(result).await;
                }
            }));
        }
        drop(result_tx);

        let logger = tokio::spawn(async move {
            while let Some(result) = result_rx.recv().await {
                if let Err(e) = result {
                    error!(error = %e, "failed to send metrics batch");
                }
            }
        });

        Self { job_tx, workers, logger }
    }

    /// Enqueues a batch for delivery. Blocks (briefly) if every worker is
    /// already busy, providing the natural backpressure the bounded
    /// channel is sized for.
    pub async fn submit(&self, batch: Vec<Metric>) {
        if self.job_tx.send(batch).await.is_err() {
            error!("sender pool job channel closed, dropping batch");
        }
    }

    /// Closes the job channel and waits for every worker and the logger
    /// task to drain.
    pub async fn shutdown(self) {
        drop(self.job_tx);
        for worker in self.workers {
            let _ = worker.await;
        }
        let _ = self.logger.await;
    }
}

async fn send_with_retry(transport: &dyn Transport, batch: &[Metric]) -> Result<(), TransportError> {
    let mut last_err = None;
    for delay in RETRY_DELAYS {
        match transport.send(batch).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                error!(error = %e, delay_secs = delay.as_secs(), "failed to send request, retrying");
                last_err = Some(e);
                tokio::time::sleep(delay).await;
            }
        }
    }
    Err(last_err.expect("RETRY_DELAYS is non-empty"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct CountingTransport {
        attempts: AtomicUsize,
        fail_until: usize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _batch: &[Metric]) -> Result<(), TransportError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_until {
                Err(TransportError::BadStatus(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures_within_retry_budget() {
        let transport = CountingTransport { attempts: AtomicUsize::new(0), fail_until: 2 };
        let result = send_with_retry(&transport, &[Metric::counter("c0", 1)]).await;
        assert!(result.is_ok());
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_exhausting_retry_budget() {
        let transport = CountingTransport { attempts: AtomicUsize::new(0), fail_until: 10 };
        let result = send_with_retry(&transport, &[Metric::counter("c0", 1)]).await;
        assert!(result.is_err());
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn batch_only_resets_poll_count_on_successful_ack() {
        let (metrics, mut runtime_sampler, mut host_sampler) = AgentMetrics::new().unwrap();
        metrics.poll(&mut runtime_sampler, &mut host_sampler).await;

        let transport: Arc<dyn Transport> = Arc::new(CountingTransport { attempts: AtomicUsize::new(0), fail_until: 0 });
        let cancel = CancellationToken::new();
        let pool = SenderPool::start(1, transport, metrics.clone(), cancel.clone());
        pool.submit(metrics.snapshot().await).await;
        pool.shutdown().await;

        let snapshot = metrics.snapshot().await;
        let poll_count = snapshot.iter().find(|m| m.id == "PollCount").unwrap();
        assert_eq!(poll_count.kind, metrics_core::model::MetricKind::Counter(0));
    }
}
