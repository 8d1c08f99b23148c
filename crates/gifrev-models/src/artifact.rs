//! In-flight media artifacts.

use bytes::Bytes;

use crate::{EncodingType, HostKind};

/// Either the original fetched bytes or the reversed result.
///
/// Owned by the step that produced it until handed to the next step. The
/// buffer is immutable and shared, so every reader starts at offset zero and
/// an upload attempt can always be repeated from the beginning.
#[derive(Debug, Clone)]
pub struct MediaArtifact {
    /// Raw bytes
    pub bytes: Bytes,
    /// Host the media originally came from
    pub origin_host: HostKind,
    /// Encoding of `bytes`
    pub encoding_type: EncodingType,
    /// Duration in seconds, when known
    pub duration: Option<f64>,
    /// Number of frames, when known
    pub frame_count: Option<u64>,
    /// Whether an audio track is present
    pub has_audio: bool,
}

impl MediaArtifact {
    pub fn new(bytes: impl Into<Bytes>, origin_host: HostKind, encoding_type: EncodingType) -> Self {
        Self {
            bytes: bytes.into(),
            origin_host,
            encoding_type,
            duration: None,
            frame_count: None,
            has_audio: false,
        }
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_frame_count(mut self, frame_count: Option<u64>) -> Self {
        self.frame_count = frame_count;
        self
    }

    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Build the artifact produced by reversing `self`: new bytes and
    /// encoding, same origin and timing metadata.
    pub fn reversed(&self, bytes: impl Into<Bytes>, encoding_type: EncodingType) -> Self {
        Self {
            bytes: bytes.into(),
            origin_host: self.origin_host,
            encoding_type,
            duration: self.duration,
            frame_count: self.frame_count,
            has_audio: self.has_audio && encoding_type != EncodingType::Gif,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_keeps_metadata() {
        let original = MediaArtifact::new(vec![1u8, 2, 3], HostKind::EmbeddedHost, EncodingType::Mp4)
            .with_duration(Some(12.5))
            .with_audio(true);

        let reversed = original.reversed(vec![3u8, 2, 1], EncodingType::Webm);
        assert_eq!(reversed.origin_host, HostKind::EmbeddedHost);
        assert_eq!(reversed.duration, Some(12.5));
        assert!(reversed.has_audio);
        assert_eq!(&reversed.bytes[..], &[3, 2, 1]);
    }

    #[test]
    fn test_gif_output_drops_audio() {
        let original = MediaArtifact::new(vec![0u8], HostKind::ImageHost, EncodingType::Mp4).with_audio(true);
        assert!(!original.reversed(vec![0u8], EncodingType::Gif).has_audio);
    }
}
