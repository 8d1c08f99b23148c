//! Dedup cache: the gate before reversal and the record after upload.

use std::sync::Arc;

use gifrev_models::{DedupRecord, SourceDescriptor, UploadResult};
use gifrev_storage::DedupStore;
use tracing::debug;

use crate::error::WorkerResult;
use crate::metrics;

#[derive(Clone)]
pub struct DedupCache {
    store: Arc<dyn DedupStore>,
}

impl DedupCache {
    pub fn new(store: Arc<dyn DedupStore>) -> Self {
        Self { store }
    }

    pub async fn lookup(&self, source: &SourceDescriptor) -> WorkerResult<Option<DedupRecord>> {
        let key = source.dedup_key();
        match self.store.get(&key).await {
            Ok(Some(record)) => {
                metrics::record_dedup_lookup("hit");
                debug!(key = %key.storage_key(), url = %record.result.url, "Dedup hit");
                Ok(Some(record))
            }
            Ok(None) => {
                metrics::record_dedup_lookup("miss");
                Ok(None)
            }
            Err(e) => {
                metrics::record_dedup_lookup("error");
                Err(e.into())
            }
        }
    }

    /// Record a published reversal. Only call with a fully resolved result.
    pub async fn store(&self, source: &SourceDescriptor, result: &UploadResult) -> WorkerResult<DedupRecord> {
        let record = DedupRecord::new(source, result.clone());
        self.store.put(&record).await?;
        debug!(key = %record.key.storage_key(), "Stored dedup record");
        Ok(record)
    }

    /// Drop a stale record. Returns whether one existed.
    pub async fn invalidate(&self, source: &SourceDescriptor) -> WorkerResult<bool> {
        let removed = self.store.delete(&source.dedup_key()).await?;
        debug!(source = %source, removed, "Invalidated dedup record");
        Ok(removed)
    }
}

impl std::fmt::Debug for DedupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupCache")
            .field("store", &self.store.name())
            .finish()
    }
}
