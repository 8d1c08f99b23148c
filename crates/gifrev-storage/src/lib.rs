//! Persistent dedup store.
//!
//! Maps a source `(host, id, nsfw)` to the reversal already published for
//! it. Backed by Redis in production and by an in-process map in tests.

pub mod config;
pub mod error;
pub mod redis_store;
pub mod store;

use std::sync::Arc;

use tracing::info;

pub use config::{DedupBackend, DedupConfig};
pub use error::{StorageError, StorageResult};
pub use redis_store::RedisDedupStore;
pub use store::{DedupStore, MemoryDedupStore};

/// Open the store selected by `config`.
pub fn open(config: DedupConfig) -> StorageResult<Arc<dyn DedupStore>> {
    let store: Arc<dyn DedupStore> = match config.backend {
        DedupBackend::Redis => Arc::new(RedisDedupStore::new(config)?),
        DedupBackend::Memory => Arc::new(MemoryDedupStore::new()),
    };
    info!(backend = store.name(), "Opened dedup store");
    Ok(store)
}
