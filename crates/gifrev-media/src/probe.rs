//! FFprobe media information.

use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use gifrev_models::MediaMetrics;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Measures a fetched media buffer.
#[async_trait]
pub trait ProbeAdapter: Send + Sync {
    /// Probe `bytes` for duration and frame rate. The returned metrics carry
    /// the buffer size.
    async fn probe(&self, bytes: &Bytes) -> MediaResult<MediaMetrics>;
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Probe backed by the `ffprobe` binary, fed through stdin.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe;

impl FfprobeProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProbeAdapter for FfprobeProbe {
    async fn probe(&self, bytes: &Bytes) -> MediaResult<MediaMetrics> {
        check_ffprobe()?;

        let mut child = Command::new("ffprobe")
            .args([
                "-i",
                "pipe:0",
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Feed stdin from a separate task so a full stdout pipe can't deadlock us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::ffprobe_failed("stdin not captured", None))?;
        let input = bytes.clone();
        let writer = tokio::spawn(async move {
            // ffprobe may close stdin early once it has seen enough; that's fine.
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        });

        let output = child.wait_with_output().await?;
        let _ = writer.await;

        if !output.status.success() {
            return Err(MediaError::ffprobe_failed(
                "FFprobe failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        let metrics = parse_probe_output(&output.stdout, bytes.len() as u64)?;
        debug!(
            duration = metrics.duration_seconds,
            size = bytes.len(),
            fps = ?metrics.frame_rate,
            "Probed media"
        );
        Ok(metrics)
    }
}

/// Turn ffprobe's JSON into metrics. A missing or non-positive duration is
/// a probe failure: there is nothing to reverse.
fn parse_probe_output(stdout: &[u8], size: u64) -> MediaResult<MediaMetrics> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

    let duration = probe
        .format
        .duration
        .as_deref()
        .or_else(|| video_stream.and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| MediaError::invalid_media("No duration reported"))?;

    let fps = video_stream.and_then(|s| {
        s.avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
    });

    let mut metrics = MediaMetrics::new(duration).with_size(size);
    if let Some(fps) = fps {
        metrics = metrics.with_frame_rate(fps);
    }
    Ok(metrics)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|v: &f64| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "format": {"duration": "15.200000"},
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "avg_frame_rate": "25/1", "r_frame_rate": "25/1"}
            ]
        }"#;

        let metrics = parse_probe_output(json, 1024).unwrap();
        assert!((metrics.duration_seconds - 15.2).abs() < 1e-9);
        assert_eq!(metrics.size_bytes, Some(1024));
        assert_eq!(metrics.frame_rate, Some(25.0));
    }

    #[test]
    fn test_parse_probe_output_falls_back_to_stream_duration() {
        let json = br#"{"format": {}, "streams": [{"codec_type": "video", "duration": "4.0", "avg_frame_rate": "0/0", "r_frame_rate": "10/1"}]}"#;

        let metrics = parse_probe_output(json, 10).unwrap();
        assert_eq!(metrics.duration_seconds, 4.0);
        assert_eq!(metrics.frame_rate, Some(10.0));
    }

    #[test]
    fn test_missing_duration_is_a_failure() {
        let json = br#"{"format": {}, "streams": []}"#;
        assert!(matches!(
            parse_probe_output(json, 10),
            Err(MediaError::InvalidMedia(_))
        ));
    }
}
