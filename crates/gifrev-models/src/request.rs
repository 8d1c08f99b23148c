//! Reversal requests and their outcomes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{SourceDescriptor, UploadResult};

/// A request to reverse one source; the serialized "context" handed to the
/// pipeline, inline or through the job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReverseRequest {
    /// Media to reverse
    pub source: SourceDescriptor,
    /// Re-validate a cached reversal before reusing it
    #[serde(default)]
    pub reupload: bool,
}

impl ReverseRequest {
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            reupload: false,
        }
    }

    /// Request a reupload check on a cache hit.
    pub fn with_reupload(mut self, reupload: bool) -> Self {
        self.reupload = reupload;
        self
    }
}

/// Closed set of request outcomes returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The reversal is published (freshly or from cache)
    Success { result: Option<UploadResult> },
    /// The request cannot be served because of its input
    UserFailure,
    /// Every upload option was exhausted
    UploadFailure,
}

impl Outcome {
    /// A success carrying the published reversal.
    pub fn published(result: UploadResult) -> Self {
        Outcome::Success {
            result: Some(result),
        }
    }

    /// A success with nothing published yet (e.g. the request was queued).
    pub fn accepted() -> Self {
        Outcome::Success { result: None }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// The published reversal, if any.
    pub fn result(&self) -> Option<&UploadResult> {
        match self {
            Outcome::Success { result } => result.as_ref(),
            _ => None,
        }
    }

    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::UserFailure => "user_failure",
            Outcome::UploadFailure => "upload_failure",
        }
    }
}
