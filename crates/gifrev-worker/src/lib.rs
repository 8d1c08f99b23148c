//! Reversal decision and orchestration core.
//!
//! This crate provides:
//! - Format analysis choosing the output encoding and first uploader
//! - Uploader selection with ordered fallback
//! - The upload retry and polling state machine
//! - The dedup cache gate
//! - The end-to-end pipeline and the queue-driven job executor

pub mod analyzer;
pub mod config;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod selector;

#[cfg(test)]
pub(crate) mod test_support;

pub use analyzer::{AnalysisThresholds, FormatAnalyzer};
pub use config::{UploadPolicy, WorkerConfig};
pub use dedup::DedupCache;
pub use error::{UploadError, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use orchestrator::{AttemptOutcome, UploadOrchestrator};
pub use pipeline::Pipeline;
pub use selector::{HostSelector, NotAvailable};
