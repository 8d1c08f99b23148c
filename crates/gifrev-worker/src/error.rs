//! Worker error types.

use gifrev_models::{HostKind, Outcome, TargetType};
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Why a single upload sequence on one host ended without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("{host} gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        host: HostKind,
        attempts: u32,
        last: String,
    },

    #[error("Upload cancelled")]
    Cancelled,
}

/// Failures of one reversal request.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[source] gifrev_hosts::HostError),

    #[error("Probe failed: {0}")]
    ProbeFailure(#[source] gifrev_media::MediaError),

    #[error("Reversal failed: {0}")]
    ReversalFailure(#[source] gifrev_media::MediaError),

    #[error("No uploader available for {0}")]
    NoUploader(TargetType),

    #[error("Upload exhausted: {0}")]
    UploadExhausted(UploadError),

    #[error("Cancelled")]
    Cancelled,

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] gifrev_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] gifrev_queue::QueueError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<UploadError> for WorkerError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Cancelled => WorkerError::Cancelled,
            exhausted => WorkerError::UploadExhausted(exhausted),
        }
    }
}

impl WorkerError {
    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    pub fn unsupported_source(msg: impl Into<String>) -> Self {
        Self::UnsupportedSource(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// The caller-facing outcome for this failure.
    ///
    /// Anything wrong with the source itself is a user failure. Anything that
    /// left the source reversible but unpublished is an upload failure, which
    /// the caller may retry later. A provider outage while resolving the
    /// source counts as the latter.
    pub fn outcome(&self) -> Outcome {
        match self {
            WorkerError::SourceUnavailable(e) if e.is_retryable() => Outcome::UploadFailure,
            WorkerError::InvalidSource(_)
            | WorkerError::UnsupportedSource(_)
            | WorkerError::SourceUnavailable(_)
            | WorkerError::ProbeFailure(_)
            | WorkerError::ReversalFailure(_) => Outcome::UserFailure,
            _ => Outcome::UploadFailure,
        }
    }

    /// Worth handing back to the queue for another try.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkerError::UploadExhausted(_)
                | WorkerError::Timeout(_)
                | WorkerError::Storage(_)
                | WorkerError::Queue(_)
        ) || matches!(self, WorkerError::SourceUnavailable(e) if e.is_retryable())
    }
}
