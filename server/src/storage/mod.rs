pub mod file_sync;
pub mod memory;
pub mod sql;

use std::sync::Arc;

use metrics_core::store::Store;
use tracing::{info, warn};

use crate::config::Settings;
use file_sync::{FileSyncConfig, FileSyncer};
use memory::MemoryStore;
use sql::SqlStore;

/// Chooses the backend: a configured DSN that answers a `Ping` wins;
/// anything else falls back to the in-memory store, wrapped in a file
/// syncer when a storage path was configured.
pub async fn build_store(settings: &Settings) -> Arc<dyn Store> {
    if let Some(dsn) = &settings.database_dsn {
        match SqlStore::connect(dsn).await {
            Ok(store) if store.ping().await => {
                info!("using SQL store");
                return Arc::new(store);
            }
            Ok(_) => {
                warn!("SQL store connected but failed ping, falling back to memory store");
            }
            Err(e) => {
                warn!(error = %e, "failed to connect to database, falling back to memory store");
            }
        }
    }

    let memory = Arc::new(MemoryStore::new(None));
    if let Some(path) = &settings.file_storage_path {
        let config = FileSyncConfig {
            path: path.into(),
            interval_seconds: settings.store_interval,
            restore_on_start: settings.restore,
        };
        let syncer = FileSyncer::start(config, memory.clone()).await;
        memory.set_syncer(syncer);
        info!("using in-memory store with file syncer");
        return memory;
    }

    info!("using in-memory store, no persistence configured");
    memory
}
