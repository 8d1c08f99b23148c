//! Media reversal.

use std::time::Duration;

use async_trait::async_trait;
use gifrev_models::{EncodingType, MediaArtifact};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Default ceiling for a single reversal.
const DEFAULT_REVERSE_TIMEOUT: Duration = Duration::from_secs(600);

/// Produces a time-reversed copy of an artifact.
#[async_trait]
pub trait ReversalAdapter: Send + Sync {
    /// Reverse `artifact` into `target` encoding. The source format and the
    /// audio flag are taken from the artifact itself.
    async fn reverse(&self, artifact: &MediaArtifact, target: EncodingType) -> MediaResult<MediaArtifact>;
}

/// Reverser backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegReverser {
    timeout: Duration,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl Default for FfmpegReverser {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegReverser {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_REVERSE_TIMEOUT,
            cancel_rx: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    fn runner(&self) -> FfmpegRunner {
        let runner = FfmpegRunner::new().with_timeout(self.timeout);
        match &self.cancel_rx {
            Some(rx) => runner.with_cancel(rx.clone()),
            None => runner,
        }
    }
}

/// Build the ffmpeg invocation that reverses `input` into `output`.
pub fn reverse_command(
    input: &std::path::Path,
    output: &std::path::Path,
    target: EncodingType,
    with_audio: bool,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(input, output);

    match target {
        EncodingType::Gif => cmd
            .filter_complex("[0:v]reverse,split[a][b];[a]palettegen[p];[b][p]paletteuse")
            .output_args(["-loop", "0"])
            .no_audio(),
        EncodingType::Mp4 => {
            let cmd = cmd
                .video_filter("reverse")
                .video_codec("libx264")
                .preset("fast")
                .crf(18)
                .output_args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"]);
            if with_audio {
                cmd.audio_filter("areverse").audio_codec("aac")
            } else {
                cmd.no_audio()
            }
        }
        EncodingType::Webm => {
            let cmd = cmd
                .video_filter("reverse")
                .video_codec("libvpx-vp9")
                .crf(32)
                .output_args(["-b:v", "0"]);
            if with_audio {
                cmd.audio_filter("areverse").audio_codec("libopus")
            } else {
                cmd.no_audio()
            }
        }
    }
}

#[async_trait]
impl ReversalAdapter for FfmpegReverser {
    async fn reverse(&self, artifact: &MediaArtifact, target: EncodingType) -> MediaResult<MediaArtifact> {
        if artifact.is_empty() {
            return Err(MediaError::invalid_media("Empty input"));
        }

        // MP4 input needs a seekable file, so both sides go through temp files.
        let work_dir = tempfile::tempdir()?;
        let input = work_dir
            .path()
            .join(format!("input.{}", artifact.encoding_type.extension()));
        let output = work_dir.path().join(format!("output.{}", target.extension()));

        tokio::fs::write(&input, &artifact.bytes).await?;

        let with_audio = artifact.has_audio && target != EncodingType::Gif;
        let cmd = reverse_command(&input, &output, target, with_audio);

        debug!(
            from = %artifact.encoding_type,
            to = %target,
            audio = with_audio,
            size = artifact.len(),
            "Reversing media"
        );

        self.runner().run(&cmd).await?;

        let reversed = tokio::fs::read(&output).await?;
        if reversed.is_empty() {
            return Err(MediaError::ffmpeg_failed("FFmpeg produced empty output", None, None));
        }

        info!(
            input_size = artifact.len(),
            output_size = reversed.len(),
            "Reversed {} into {}",
            artifact.encoding_type,
            target
        );

        Ok(artifact.reversed(reversed, target))
    }
}
