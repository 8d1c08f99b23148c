//! Shared data models for the GifRev reversal engine.
//!
//! This crate provides Serde-serializable types for:
//! - Media hosts, target types and encodings
//! - Source descriptors and resolved source media
//! - Probe metrics and analysis decisions
//! - In-flight media artifacts
//! - Upload results, dedup records and request outcomes
//! - Queue job identifiers

pub mod analysis;
pub mod artifact;
pub mod host;
pub mod job;
pub mod request;
pub mod source;
pub mod upload;

// Re-export common types
pub use analysis::{AnalysisResult, MediaMetrics};
pub use artifact::MediaArtifact;
pub use host::{EncodingType, HostKind, HostParseError, TargetType};
pub use job::JobId;
pub use request::{Outcome, ReverseRequest};
pub use source::{DedupKey, SourceDescriptor, SourceMedia};
pub use upload::{DedupRecord, UploadResult};
