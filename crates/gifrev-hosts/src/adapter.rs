//! The contract every hosting backend implements.

use async_trait::async_trait;
use gifrev_models::{
    EncodingType, HostKind, MediaArtifact, SourceDescriptor, SourceMedia, TargetType, UploadResult,
};

use crate::error::{HostError, HostResult};

/// Per-upload options forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Mark the upload as adult content
    pub nsfw: bool,
    /// Title shown on the published page, where the host supports one
    pub title: Option<String>,
}

impl UploadOptions {
    pub fn new(nsfw: bool) -> Self {
        Self { nsfw, title: None }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Processing handle returned by hosts that encode asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    pub host: HostKind,
    pub ticket: String,
    pub nsfw: bool,
}

impl UploadTicket {
    pub fn new(host: HostKind, ticket: impl Into<String>, nsfw: bool) -> Self {
        Self {
            host,
            ticket: ticket.into(),
            nsfw,
        }
    }
}

/// What a submit call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Usable reference, to be verified before it is trusted
    Published(UploadResult),
    /// Processing ticket, to be polled
    Pending(UploadTicket),
}

/// Result of checking a published reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Live,
    /// The host silently replaced the upload with a placeholder
    Removed,
}

/// One status check on a processing ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Done(UploadResult),
    Processing,
    OverCapacity,
}

/// A media hosting backend.
///
/// Source-side operations (`analyze`, `fetch`) resolve and download existing
/// media. Upload-side operations (`submit`, `verify`, `poll`) publish a new
/// artifact. A host that cannot accept uploads reports no supported targets.
#[async_trait]
pub trait HostAdapter: Send + Sync {
    /// Backend identity.
    fn kind(&self) -> HostKind;

    /// Whether uploads of this target type are accepted.
    fn supports(&self, target: TargetType) -> bool;

    /// Position in the fallback ordering for `target`, lowest first.
    /// `None` keeps the host out of the ordering even if it supports the
    /// target (it can still be chosen as an analysis primary).
    fn fallback_priority(&self, _target: TargetType) -> Option<u8> {
        None
    }

    /// Container this host wants for video uploads.
    fn video_encoding(&self) -> EncodingType {
        EncodingType::Mp4
    }

    /// Resolve a source hosted here. `Ok(None)` means the media is gone.
    async fn analyze(&self, source: &SourceDescriptor) -> HostResult<Option<SourceMedia>>;

    /// Download the resolved media in a single pass.
    async fn fetch(&self, source: &SourceDescriptor, media: &SourceMedia) -> HostResult<MediaArtifact>;

    /// Send an artifact to the host.
    async fn submit(&self, artifact: &MediaArtifact, options: &UploadOptions) -> HostResult<Submission>;

    /// Check that a published reference still resolves to the upload.
    async fn verify(&self, _published: &UploadResult) -> HostResult<Verification> {
        Ok(Verification::Live)
    }

    /// Check a processing ticket once.
    async fn poll(&self, ticket: &UploadTicket) -> HostResult<PollStatus> {
        Err(HostError::unsupported(format!(
            "{} does not issue processing tickets ({})",
            self.kind(),
            ticket.ticket
        )))
    }
}
