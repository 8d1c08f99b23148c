//! Media host, target type and encoding definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of media providers a source can live on and an artifact
/// can be published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    /// Image/video CDN with fast uploads but limited capacity ("host A")
    ImageHost,
    /// Higher capacity image/video CDN ("host B")
    VideoHost,
    /// Link-only video CDN
    LinkHost,
    /// Media embedded in a submission; a source, never an upload target
    EmbeddedHost,
}

impl HostKind {
    /// All host kinds, in declaration order.
    pub const ALL: &'static [HostKind] = &[
        HostKind::ImageHost,
        HostKind::VideoHost,
        HostKind::LinkHost,
        HostKind::EmbeddedHost,
    ];

    /// Stable identifier used in storage keys, metrics labels and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::ImageHost => "image_host",
            HostKind::VideoHost => "video_host",
            HostKind::LinkHost => "link_host",
            HostKind::EmbeddedHost => "embedded_host",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HostKind {
    type Err = HostParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image_host" => Ok(HostKind::ImageHost),
            "video_host" => Ok(HostKind::VideoHost),
            "link_host" => Ok(HostKind::LinkHost),
            "embedded_host" => Ok(HostKind::EmbeddedHost),
            _ => Err(HostParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown host: {0}")]
pub struct HostParseError(String);

/// Encoding family chosen for the reversed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Gif,
    Video,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Gif => "gif",
            TargetType::Video => "video",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Concrete container/codec of a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncodingType {
    Gif,
    #[default]
    Mp4,
    Webm,
}

impl EncodingType {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingType::Gif => "gif",
            EncodingType::Mp4 => "mp4",
            EncodingType::Webm => "webm",
        }
    }

    /// MIME type sent with uploads.
    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodingType::Gif => "image/gif",
            EncodingType::Mp4 => "video/mp4",
            EncodingType::Webm => "video/webm",
        }
    }

    /// The target family this encoding belongs to.
    pub fn target_type(&self) -> TargetType {
        match self {
            EncodingType::Gif => TargetType::Gif,
            EncodingType::Mp4 | EncodingType::Webm => TargetType::Video,
        }
    }

    /// Guess the encoding from a URL path extension.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
        if path.ends_with(".gif") {
            Some(EncodingType::Gif)
        } else if path.ends_with(".mp4") || path.ends_with(".gifv") {
            Some(EncodingType::Mp4)
        } else if path.ends_with(".webm") {
            Some(EncodingType::Webm)
        } else {
            None
        }
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_kind_string_roundtrip() {
        for host in HostKind::ALL {
            let parsed: HostKind = host.as_str().parse().unwrap();
            assert_eq!(parsed, *host);
        }
        assert!("gfycat".parse::<HostKind>().is_err());
    }

    #[test]
    fn test_host_kind_serde_is_snake_case() {
        let json = serde_json::to_string(&HostKind::LinkHost).unwrap();
        assert_eq!(json, "\"link_host\"");
    }

    #[test]
    fn test_encoding_from_url() {
        assert_eq!(EncodingType::from_url("https://i.example.com/a.GIF"), Some(EncodingType::Gif));
        assert_eq!(EncodingType::from_url("https://i.example.com/a.gifv?x=1"), Some(EncodingType::Mp4));
        assert_eq!(EncodingType::from_url("https://v.example.com/DASH_720"), None);
    }

    #[test]
    fn test_encoding_target_type() {
        assert_eq!(EncodingType::Gif.target_type(), TargetType::Gif);
        assert_eq!(EncodingType::Webm.target_type(), TargetType::Video);
        assert_eq!(EncodingType::Mp4.mime_type(), "video/mp4");
    }
}
