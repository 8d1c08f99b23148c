//! Probe metrics and analysis decisions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{HostKind, TargetType};

/// Measurements of a fetched source. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaMetrics {
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Total byte size, when it was measured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Frame rate (fps), when the probe reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
}

impl MediaMetrics {
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            size_bytes: None,
            frame_rate: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    /// Estimated number of frames, if both duration and frame rate are known.
    pub fn frame_count(&self) -> Option<u64> {
        self.frame_rate
            .filter(|fps| *fps > 0.0)
            .map(|fps| (self.duration_seconds * fps).round() as u64)
    }
}

/// How a source must be re-encoded and where it goes first.
///
/// Derived deterministically from [`MediaMetrics`]; immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    /// Encoding family of the reversed artifact
    pub target_type: TargetType,
    /// Uploader tried first
    pub primary_uploader: HostKind,
    /// Uploader tried when the primary exhausts its attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_uploader: Option<HostKind>,
}

impl AnalysisResult {
    pub fn new(target_type: TargetType, primary_uploader: HostKind) -> Self {
        Self {
            target_type,
            primary_uploader,
            fallback_uploader: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Option<HostKind>) -> Self {
        self.fallback_uploader = fallback;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let metrics = MediaMetrics::new(2.0).with_frame_rate(24.0);
        assert_eq!(metrics.frame_count(), Some(48));
        assert_eq!(MediaMetrics::new(2.0).frame_count(), None);
    }

    #[test]
    fn test_analysis_result_omits_missing_fallback() {
        let result = AnalysisResult::new(TargetType::Video, HostKind::ImageHost);
        let json = serde_json::to_value(result).unwrap();
        assert!(json.get("fallback_uploader").is_none());
    }
}
