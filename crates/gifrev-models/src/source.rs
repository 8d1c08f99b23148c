//! Source descriptors and resolved source media.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{EncodingType, HostKind};

/// Identifies a piece of already-hosted media.
///
/// `(host, id)` uniquely identifies a source. Descriptors are created at
/// request entry and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SourceDescriptor {
    /// Provider the media lives on
    pub host: HostKind,
    /// Provider-specific media identifier
    pub id: String,
    /// URL the media was referenced by
    pub url: String,
    /// Whether the media is marked not-safe-for-work
    #[serde(default)]
    pub nsfw: bool,
}

impl SourceDescriptor {
    pub fn new(host: HostKind, id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            host,
            id: id.into(),
            url: url.into(),
            nsfw: false,
        }
    }

    /// Mark the source as NSFW.
    pub fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    /// A source can only be analyzed when it carries an identifier.
    pub fn is_analyzable(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Key of the persisted dedup record for this source.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            host: self.host,
            id: self.id.clone(),
            nsfw: self.nsfw,
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.id)
    }
}

/// Persistent store key: `(host, id, nsfw)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DedupKey {
    pub host: HostKind,
    pub id: String,
    pub nsfw: bool,
}

impl DedupKey {
    /// Flat string form used as a storage key suffix.
    ///
    /// Format: `{host}:{id}:{nsfw}`
    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}", self.host, self.id, self.nsfw)
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// What a host adapter resolved a source into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceMedia {
    /// Direct URL of the raw media bytes
    pub media_url: String,
    /// Native encoding of the bytes behind `media_url`
    pub encoding: EncodingType,
    /// Natively short-form and gif-like (subject to the size override)
    #[serde(default)]
    pub gif_like: bool,
    /// Whether the media is animated at all
    #[serde(default = "default_animated")]
    pub animated: bool,
    /// Whether the media carries an audio track
    #[serde(default)]
    pub has_audio: bool,
}

fn default_animated() -> bool {
    true
}

impl SourceMedia {
    pub fn new(media_url: impl Into<String>, encoding: EncodingType) -> Self {
        Self {
            media_url: media_url.into(),
            encoding,
            gif_like: false,
            animated: true,
            has_audio: false,
        }
    }

    pub fn with_gif_like(mut self, gif_like: bool) -> Self {
        self.gif_like = gif_like;
        self
    }

    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }
}
