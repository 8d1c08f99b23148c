//! Media host adapters.
//!
//! Each backend implements [`HostAdapter`]: resolving and downloading source
//! media it hosts, and publishing reversed artifacts where it accepts uploads.
//! All adapters share one pooled `reqwest` client and report per-request
//! metrics.

pub mod adapter;
pub mod config;
pub mod embedded_host;
pub mod error;
pub mod http;
pub mod image_host;
pub mod link_host;
pub mod metrics;
pub mod registry;
pub mod video_host;

pub use adapter::{HostAdapter, PollStatus, Submission, UploadOptions, UploadTicket, Verification};
pub use config::{
    EmbeddedHostConfig, HostsConfig, HttpConfig, ImageHostConfig, LinkHostConfig, VideoHostConfig,
};
pub use embedded_host::EmbeddedHost;
pub use error::{HostError, HostResult};
pub use image_host::ImageHost;
pub use link_host::LinkHost;
pub use registry::HostRegistry;
pub use video_host::VideoHost;
