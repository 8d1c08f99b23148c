//! Worker configuration.

use std::time::Duration;

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Ceiling on one request, end to end
    pub job_timeout: Duration,
    /// Ceiling on a single ffmpeg reversal
    pub reversal_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery).
    /// Kept above `job_timeout` so a live job is never claimed twice.
    pub claim_min_idle: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            job_timeout: Duration::from_secs(1800),
            reversal_timeout: Duration::from_secs(600),
            shutdown_timeout: Duration::from_secs(30),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(2400),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse("WORKER_MAX_JOBS").unwrap_or(defaults.max_concurrent_jobs),
            job_timeout: env_parse("WORKER_JOB_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            reversal_timeout: env_parse("WORKER_REVERSAL_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.reversal_timeout),
            shutdown_timeout: env_parse("WORKER_SHUTDOWN_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            claim_interval: env_parse("WORKER_CLAIM_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.claim_interval),
            claim_min_idle: env_parse("WORKER_CLAIM_MIN_IDLE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.claim_min_idle),
        }
    }
}

/// Retry and polling budget for one uploader.
///
/// A full attempt is submit plus verify or poll. Attempts are separated by
/// `retry_delay`, or by `capacity_delay` after the host reported it was over
/// capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub capacity_delay: Duration,
    pub poll_interval: Duration,
    /// Status checks per attempt
    pub max_poll_checks: u32,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(30),
            capacity_delay: Duration::from_secs(90),
            poll_interval: Duration::from_secs(5),
            max_poll_checks: 15,
        }
    }
}

impl UploadPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_parse("UPLOAD_MAX_ATTEMPTS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_attempts),
            retry_delay: env_parse("UPLOAD_RETRY_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
            capacity_delay: env_parse("UPLOAD_CAPACITY_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.capacity_delay),
            poll_interval: env_parse("UPLOAD_POLL_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            max_poll_checks: env_parse("UPLOAD_MAX_POLL_CHECKS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_poll_checks),
        }
    }

    /// Longest time one attempt can spend polling.
    pub fn max_poll_time(&self) -> Duration {
        self.poll_interval * self.max_poll_checks
    }
}
