//! Redis-backed dedup store.

use async_trait::async_trait;
use gifrev_models::{DedupKey, DedupRecord};
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::config::DedupConfig;
use crate::error::StorageResult;
use crate::store::DedupStore;

/// Records live under `{prefix}:{host}:{id}:{nsfw}` as JSON strings.
pub struct RedisDedupStore {
    client: redis::Client,
    config: DedupConfig,
}

impl RedisDedupStore {
    pub fn new(config: DedupConfig) -> StorageResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Full Redis key for a record.
    pub fn record_key(&self, key: &DedupKey) -> String {
        format!("{}:{}", self.config.key_prefix, key.storage_key())
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn get(&self, key: &DedupKey) -> StorageResult<Option<DedupRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(self.record_key(key)).await?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        // An unreadable record is treated as a miss; the next store overwrites it.
        match serde_json::from_str(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable dedup record");
                Ok(None)
            }
        }
    }

    async fn put(&self, record: &DedupRecord) -> StorageResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let redis_key = self.record_key(&record.key);
        let payload = serde_json::to_string(record)?;

        match self.config.ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(&redis_key, payload, ttl.as_secs()).await?,
            None => conn.set::<_, _, ()>(&redis_key, payload).await?,
        }

        debug!(key = %redis_key, "Stored dedup record");
        Ok(())
    }

    async fn delete(&self, key: &DedupKey) -> StorageResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let removed: u64 = conn.del(self.record_key(key)).await?;
        Ok(removed > 0)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gifrev_models::HostKind;

    #[test]
    fn test_record_key_layout() {
        let store = RedisDedupStore::new(DedupConfig::default()).unwrap();
        let key = DedupKey {
            host: HostKind::LinkHost,
            id: "ab12".to_string(),
            nsfw: true,
        };
        assert_eq!(store.record_key(&key), "gifrev:dedup:link_host:ab12:true");
    }
}
