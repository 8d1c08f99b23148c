//! Job types for the queue.

use chrono::{DateTime, Utc};
use gifrev_models::{JobId, ReverseRequest};
use serde::{Deserialize, Serialize};

/// A reversal request deferred to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseJob {
    /// Unique job ID
    pub job_id: JobId,
    /// The request as the caller submitted it
    pub request: ReverseRequest,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl ReverseJob {
    pub fn new(request: ReverseRequest) -> Self {
        Self {
            job_id: JobId::new(),
            request,
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    ///
    /// Two requests for the same source and nsfw flag share a key, so a
    /// burst of identical requests is only queued once.
    pub fn idempotency_key(&self) -> String {
        let source = &self.request.source;
        format!("reverse:{}:{}:{}", source.host, source.id, source.nsfw)
    }
}
