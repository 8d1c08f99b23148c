//! Dedup store contract and the in-process backend.

use std::collections::HashMap;

use async_trait::async_trait;
use gifrev_models::{DedupKey, DedupRecord};
use tokio::sync::RwLock;

use crate::error::StorageResult;

/// Point lookup, upsert and delete of whole records.
///
/// Each operation touches exactly one key, so backends only need single-key
/// atomicity.
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn get(&self, key: &DedupKey) -> StorageResult<Option<DedupRecord>>;

    /// Insert or replace the record under its own key.
    async fn put(&self, record: &DedupRecord) -> StorageResult<()>;

    /// Remove a record. Returns whether one existed.
    async fn delete(&self, key: &DedupKey) -> StorageResult<bool>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Process-local store. Used by tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryDedupStore {
    records: RwLock<HashMap<DedupKey, DedupRecord>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn get(&self, key: &DedupKey) -> StorageResult<Option<DedupRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, record: &DedupRecord) -> StorageResult<()> {
        self.records
            .write()
            .await
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &DedupKey) -> StorageResult<bool> {
        Ok(self.records.write().await.remove(key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
