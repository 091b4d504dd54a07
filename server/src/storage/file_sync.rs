use std::path::PathBuf;
use std::sync::Arc;

use metrics_core::model::Metric;
use tokio::fs;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::memory::MemoryStore;

/// File syncer configuration.
#[derive(Debug, Clone)]
pub struct FileSyncConfig {
    pub path: PathBuf,
    pub interval_seconds: u64,
    pub restore_on_start: bool,
}

/// Wraps a `MemoryStore`, periodically (or on every write) dumping both
/// maps to a JSON file and optionally restoring from it on startup.
pub struct FileSyncer {
    config: FileSyncConfig,
    notify_tx: Option<mpsc::Sender<()>>,
    task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl FileSyncer {
    /// Restores the store (if configured) and starts the background sync
    /// task. The returned syncer is meant to be attached to the
    /// `MemoryStore` it was built against.
    pub async fn start(config: FileSyncConfig, store: Arc<MemoryStore>) -> Arc<Self> {
        if config.restore_on_start {
            match Self::load(&config.path).await {
                Ok(metrics) => {
                    info!(path = %config.path.display(), "restored metrics from file");
                    store.load_snapshot(metrics).await;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!(path = %config.path.display(), "no snapshot file yet, starting empty");
                }
                Err(e) => {
                    error!(error = %e, "failed to restore metrics from file");
                }
            }
        }

        let cancel = CancellationToken::new();
        let (notify_tx, handle) = if config.interval_seconds == 0 {
            let (tx, mut rx) = mpsc::channel::<()>(256);
            let path = config.path.clone();
            let store_clone = store.clone();
            let cancel_clone = cancel.clone();
            let handle = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        got = rx.recv() => {
                            if got.is_none() {
                                break;
                            }
                            if let Err(e) = Self::sync(&path, &store_clone).await {
                                error!(error = %e, "failed to sync metrics to file");
                            }
                        }
                        _ = cancel_clone.cancelled() => break,
                    }
                }
                // Final drain write on shutdown.
                if let Err(e) = Self::sync(&path, &store_clone).await {
                    error!(error = %e, "failed final sync to file");
                }
            });
            (Some(tx), handle)
        } else {
            let path = config.path.clone();
            let store_clone = store.clone();
            let cancel_clone = cancel.clone();
            let interval_seconds = config.interval_seconds;
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if let Err(e) = Self::sync(&path, &store_clone).await {
                                error!(error = %e, "failed to sync metrics to file");
                            }
                        }
                        _ = cancel_clone.cancelled() => break,
                    }
                }
                if let Err(e) = Self::sync(&path, &store_clone).await {
                    error!(error = %e, "failed final sync to file");
                }
            });
            (None, handle)
        };

        Arc::new(Self {
            config,
            notify_tx,
            task: Mutex::new(Some(handle)),
            cancel,
        })
    }

    pub fn config(&self) -> &FileSyncConfig {
        &self.config
    }

    /// Signals the sync task after a successful write. No-op (and never
    /// blocking the caller for long) when running on a fixed interval.
    pub fn notify(&self) {
        if let Some(tx) = &self.notify_tx {
            let _ = tx.try_send(());
        }
    }

    /// Cancels the background task and waits for its final write.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(tx) = &self.notify_tx {
            // Wake the event-driven task if it's parked on recv().
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }

    async fn sync(path: &PathBuf, store: &MemoryStore) -> std::io::Result<()> {
        let counters = store.get_counters().await.unwrap_or_default();
        let gauges = store.get_gauges().await.unwrap_or_default();
        let mut metrics = Vec::with_capacity(counters.len() + gauges.len());
        for (id, delta) in counters {
            metrics.push(Metric::counter(id, delta));
        }
        for (id, value) in gauges {
            metrics.push(Metric::gauge(id, value));
        }
        let json = serde_json::to_vec(&metrics)?;
        fs::write(path, json).await
    }

    async fn load(path: &PathBuf) -> std::io::Result<Vec<Metric>> {
        let bytes = fs::read(path).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("metrics-syncer-test-{}.json", std::process::id()));

        let store = Arc::new(MemoryStore::new(None));
        store
            .load_snapshot(vec![Metric::counter("c0", 64), Metric::gauge("g0", 64.0)])
            .await;

        FileSyncer::sync(&path, &store).await.unwrap();
        let loaded = FileSyncer::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);

        let restored = MemoryStore::new(None);
        restored.load_snapshot(loaded).await;
        assert_eq!(restored.get_counters().await.unwrap()["c0"], 64);
        assert_eq!(restored.get_gauges().await.unwrap()["g0"], 64.0);

        let _ = fs::remove_file(path).await;
    }

    #[tokio::test]
    async fn missing_file_is_not_fatal() {
        let config = FileSyncConfig {
            path: std::env::temp_dir().join("does-not-exist-metrics.json"),
            interval_seconds: 3600,
            restore_on_start: true,
        };
        let store = Arc::new(MemoryStore::new(None));
        let syncer = FileSyncer::start(config, store).await;
        syncer.shutdown().await;
    }
}
