//! Submission host whose posts embed media. Source only.

use async_trait::async_trait;
use gifrev_models::{EncodingType, HostKind, MediaArtifact, SourceDescriptor, SourceMedia, TargetType};
use serde_json::Value;

use crate::adapter::{HostAdapter, Submission, UploadOptions};
use crate::config::EmbeddedHostConfig;
use crate::error::{HostError, HostResult};
use crate::http::HostHttp;

pub struct EmbeddedHost {
    http: HostHttp,
    config: EmbeddedHostConfig,
}

impl EmbeddedHost {
    pub fn new(http: HostHttp, config: EmbeddedHostConfig) -> Self {
        Self { http, config }
    }
}

/// Pull the embedded video out of a submission listing.
fn embedded_video(listing: &Value) -> Option<SourceMedia> {
    let post = &listing[0]["data"]["children"][0]["data"];
    let video = ["secure_media", "media"]
        .iter()
        .map(|field| &post[*field]["reddit_video"])
        .find(|v| v.is_object())?;

    let url = video["fallback_url"].as_str()?;
    Some(
        SourceMedia::new(url, EncodingType::Mp4)
            .with_gif_like(video["is_gif"].as_bool().unwrap_or(false))
            .with_audio(video["has_audio"].as_bool().unwrap_or(true)),
    )
}

#[async_trait]
impl HostAdapter for EmbeddedHost {
    fn kind(&self) -> HostKind {
        HostKind::EmbeddedHost
    }

    fn supports(&self, _target: TargetType) -> bool {
        false
    }

    async fn analyze(&self, source: &SourceDescriptor) -> HostResult<Option<SourceMedia>> {
        if EncodingType::from_url(&source.url) == Some(EncodingType::Gif) {
            return Ok(Some(
                SourceMedia::new(source.url.clone(), EncodingType::Gif).with_gif_like(true),
            ));
        }

        let request = self.http.client().get(format!(
            "{}/comments/{}.json",
            self.config.api_base,
            urlencoding::encode(&source.id)
        ));
        let Some(listing) = self.http.json_or_none::<Value>("analyze", request).await? else {
            return Ok(None);
        };
        Ok(embedded_video(&listing))
    }

    async fn fetch(&self, source: &SourceDescriptor, media: &SourceMedia) -> HostResult<MediaArtifact> {
        self.http.fetch_artifact(source, media).await
    }

    async fn submit(&self, _artifact: &MediaArtifact, _options: &UploadOptions) -> HostResult<Submission> {
        Err(HostError::unsupported("embedded host does not accept uploads"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_http;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn host(server: &MockServer) -> EmbeddedHost {
        EmbeddedHost::new(
            test_http(HostKind::EmbeddedHost),
            EmbeddedHostConfig { api_base: server.uri() },
        )
    }

    #[test]
    fn test_embedded_video_prefers_secure_media() {
        let listing = json!([{"data": {"children": [{"data": {
            "secure_media": {"reddit_video": {"fallback_url": "https://v.example.com/a/DASH_720.mp4", "is_gif": true, "has_audio": false}},
            "media": {"reddit_video": {"fallback_url": "http://other"}}
        }}]}}]);

        let media = embedded_video(&listing).unwrap();
        assert_eq!(media.media_url, "https://v.example.com/a/DASH_720.mp4");
        assert!(media.gif_like);
        assert!(!media.has_audio);
    }

    #[test]
    fn test_embedded_video_missing() {
        let listing = json!([{"data": {"children": [{"data": {"url": "https://example.com"}}]}}]);
        assert!(embedded_video(&listing).is_none());
    }

    #[tokio::test]
    async fn test_direct_gif_link_skips_lookup() {
        let server = MockServer::start().await;
        let source = SourceDescriptor::new(HostKind::EmbeddedHost, "p1", "https://i.example.com/p1.gif");

        let media = host(&server).analyze(&source).await.unwrap().unwrap();
        assert_eq!(media.encoding, EncodingType::Gif);
        assert!(media.gif_like);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_follows_submission_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/comments/p2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"data": {"children": [{"data": {
                "media": {"reddit_video": {"fallback_url": "https://v.example.com/p2.mp4"}}
            }}]}}])))
            .mount(&server)
            .await;

        let source = SourceDescriptor::new(HostKind::EmbeddedHost, "p2", "https://e.example.com/comments/p2");
        let media = host(&server).analyze(&source).await.unwrap().unwrap();
        assert_eq!(media.media_url, "https://v.example.com/p2.mp4");
        assert!(media.has_audio);
    }

    #[tokio::test]
    async fn test_submit_is_unsupported() {
        let server = MockServer::start().await;
        let artifact = MediaArtifact::new(vec![1u8], HostKind::EmbeddedHost, EncodingType::Mp4);
        let err = host(&server)
            .submit(&artifact, &UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Unsupported(_)));
    }
}
