//! Dedup store configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::error::StorageError;

/// Which store backs the dedup cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupBackend {
    #[default]
    Redis,
    /// Process-local; records are lost on restart
    Memory,
}

impl FromStr for DedupBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(StorageError::config_error(format!("unknown dedup backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DedupConfig {
    pub backend: DedupBackend,
    pub redis_url: String,
    /// Prefix for every record key
    pub key_prefix: String,
    /// Optional expiry for records; `None` keeps them until invalidated
    pub ttl: Option<Duration>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            backend: DedupBackend::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "gifrev:dedup".to_string(),
            ttl: None,
        }
    }
}

impl DedupConfig {
    pub fn memory() -> Self {
        Self {
            backend: DedupBackend::Memory,
            ..Self::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, StorageError> {
        let backend = match std::env::var("DEDUP_BACKEND") {
            Ok(value) if !value.is_empty() => value.parse()?,
            _ => DedupBackend::default(),
        };

        Ok(Self {
            backend,
            redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("DEDUP_KEY_PREFIX").unwrap_or_else(|_| "gifrev:dedup".to_string()),
            ttl: std::env::var("DEDUP_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("Memory".parse::<DedupBackend>().unwrap(), DedupBackend::Memory);
        assert_eq!("redis".parse::<DedupBackend>().unwrap(), DedupBackend::Redis);
        assert!("sqlite".parse::<DedupBackend>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = DedupConfig::default();
        assert_eq!(config.key_prefix, "gifrev:dedup");
        assert!(config.ttl.is_none());
    }
}
