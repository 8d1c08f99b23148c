//! Format analysis policy.
//!
//! Maps a probed source to the encoding family of its reversal and the
//! uploader tried first. Pure: the same media and metrics always produce the
//! same result.

use gifrev_models::{AnalysisResult, HostKind, MediaMetrics, SourceMedia, TargetType};

/// Product thresholds. Every boundary belongs to the lower tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisThresholds {
    /// Up to this many seconds, video goes to the fast host
    pub fast_video_max_secs: f64,
    /// Up to this many seconds, the result stays a video
    pub video_max_secs: f64,
    /// Gif-like sources above this size skip the fast host
    pub large_gif_bytes: u64,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            fast_video_max_secs: 30.0,
            video_max_secs: 60.0,
            large_gif_bytes: 175_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatAnalyzer {
    thresholds: AnalysisThresholds,
}

impl FormatAnalyzer {
    pub fn new(thresholds: AnalysisThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(&self, media: &SourceMedia, metrics: &MediaMetrics) -> AnalysisResult {
        let t = &self.thresholds;
        let duration = metrics.duration_seconds;

        let (target, mut primary) = if duration <= t.fast_video_max_secs {
            (TargetType::Video, HostKind::ImageHost)
        } else if duration <= t.video_max_secs {
            (TargetType::Video, HostKind::VideoHost)
        } else {
            (TargetType::Gif, HostKind::VideoHost)
        };

        // The fast host's encoder bloats large gifs.
        if media.gif_like && metrics.size_bytes.is_some_and(|size| size > t.large_gif_bytes) {
            primary = HostKind::VideoHost;
        }

        AnalysisResult::new(target, primary)
    }
}
