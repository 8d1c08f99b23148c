//! Upload results and dedup records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{DedupKey, HostKind, SourceDescriptor};

/// Terminal, successful outcome of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct UploadResult {
    /// Backend the artifact was published to
    pub host: HostKind,
    /// Backend-specific identifier of the published artifact
    pub id: String,
    /// Public URL of the published artifact
    pub url: String,
    /// Whether the artifact was published as NSFW
    #[serde(default)]
    pub nsfw: bool,
}

impl UploadResult {
    pub fn new(host: HostKind, id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            host,
            id: id.into(),
            url: url.into(),
            nsfw: false,
        }
    }

    pub fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    /// Describe the published artifact as a source, so it can be
    /// re-analyzed to check that it still exists.
    pub fn as_source(&self) -> SourceDescriptor {
        SourceDescriptor::new(self.host, self.id.clone(), self.url.clone()).with_nsfw(self.nsfw)
    }
}

/// Persisted mapping from a source to its already-published reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DedupRecord {
    /// Key of the source this record was created for
    pub key: DedupKey,
    /// Published reversal
    pub result: UploadResult,
    /// When the record was stored
    pub created_at: DateTime<Utc>,
}

impl DedupRecord {
    pub fn new(source: &SourceDescriptor, result: UploadResult) -> Self {
        Self {
            key: source.dedup_key(),
            result,
            created_at: Utc::now(),
        }
    }
}
