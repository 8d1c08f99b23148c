//! FFprobe/FFmpeg adapters for probing and reversing media.
//!
//! This crate provides:
//! - The `ProbeAdapter` and `ReversalAdapter` seams consumed by the worker
//! - An ffprobe-backed probe reading from an in-memory buffer
//! - Type-safe FFmpeg command building with timeout and cancellation
//! - An ffmpeg-backed reverser producing GIF, MP4 or WebM output

pub mod command;
pub mod error;
pub mod probe;
pub mod reverse;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{FfprobeProbe, ProbeAdapter};
pub use reverse::{FfmpegReverser, ReversalAdapter};
