//! Link-only video CDN adapter.

use async_trait::async_trait;
use gifrev_models::{
    EncodingType, HostKind, MediaArtifact, SourceDescriptor, SourceMedia, TargetType, UploadResult,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, RequestBuilder};
use serde::Deserialize;

use crate::adapter::{HostAdapter, PollStatus, Submission, UploadOptions, UploadTicket};
use crate::config::LinkHostConfig;
use crate::error::{HostError, HostResult};
use crate::http::HostHttp;

/// Video status codes reported by the host.
mod status {
    pub const READY: u8 = 2;
    pub const ERROR: u8 = 3;
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    status: u8,
    #[serde(default)]
    files: Files,
}

#[derive(Debug, Default, Deserialize)]
struct Files {
    mp4: Option<FileInfo>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    shortcode: String,
}

pub struct LinkHost {
    http: HostHttp,
    config: LinkHostConfig,
}

impl LinkHost {
    pub fn new(http: HostHttp, config: LinkHostConfig) -> Self {
        Self { http, config }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    fn video_url(&self, shortcode: &str) -> String {
        format!("{}/videos/{}", self.config.api_base, urlencoding::encode(shortcode))
    }
}

/// File URLs come back protocol-relative.
fn absolute(url: String) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url
    }
}

#[async_trait]
impl HostAdapter for LinkHost {
    fn kind(&self) -> HostKind {
        HostKind::LinkHost
    }

    fn supports(&self, target: TargetType) -> bool {
        target == TargetType::Video
    }

    fn fallback_priority(&self, target: TargetType) -> Option<u8> {
        self.supports(target).then_some(2)
    }

    async fn analyze(&self, source: &SourceDescriptor) -> HostResult<Option<SourceMedia>> {
        let request = self.authorized(self.http.client().get(self.video_url(&source.id)));
        let Some(video) = self.http.json_or_none::<VideoInfo>("analyze", request).await? else {
            return Ok(None);
        };

        if video.status == status::ERROR {
            return Ok(None);
        }
        let file = video
            .files
            .mp4
            .ok_or_else(|| HostError::invalid_response(format!("{} has no mp4 file yet", source.id)))?;
        Ok(Some(SourceMedia::new(absolute(file.url), EncodingType::Mp4)))
    }

    async fn fetch(&self, source: &SourceDescriptor, media: &SourceMedia) -> HostResult<MediaArtifact> {
        self.http.fetch_artifact(source, media).await
    }

    async fn submit(&self, artifact: &MediaArtifact, options: &UploadOptions) -> HostResult<Submission> {
        let encoding = artifact.encoding_type;
        let file = Part::stream(Body::from(artifact.bytes.clone()))
            .file_name(format!("reversed.{}", encoding.extension()))
            .mime_str(encoding.mime_type())?;
        let mut form = Form::new().part("file", file);
        if let Some(title) = &options.title {
            form = form.text("title", title.clone());
        }

        let request = self.authorized(
            self.http
                .client()
                .post(format!("{}/upload", self.config.api_base))
                .multipart(form),
        );
        let upload: UploadResponse = self.http.json("upload", request).await?;

        Ok(Submission::Pending(UploadTicket::new(
            HostKind::LinkHost,
            upload.shortcode,
            options.nsfw,
        )))
    }

    async fn poll(&self, ticket: &UploadTicket) -> HostResult<PollStatus> {
        let request = self.authorized(self.http.client().get(self.video_url(&ticket.ticket)));
        let video: VideoInfo = self.http.json("poll", request).await?;

        match video.status {
            status::READY => Ok(PollStatus::Done(
                UploadResult::new(
                    HostKind::LinkHost,
                    ticket.ticket.clone(),
                    format!("{}/{}", self.config.page_base, ticket.ticket),
                )
                .with_nsfw(ticket.nsfw),
            )),
            status::ERROR => Err(HostError::rejected(format!("processing failed for {}", ticket.ticket))),
            _ => Ok(PollStatus::Processing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_http;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn host(server: &MockServer) -> LinkHost {
        LinkHost::new(
            test_http(HostKind::LinkHost),
            LinkHostConfig {
                api_base: server.uri(),
                page_base: "https://l.example.com".to_string(),
                username: Some("user".to_string()),
                password: Some("pass".to_string()),
            },
        )
    }

    #[test]
    fn test_only_video_is_supported() {
        let adapter = LinkHost::new(test_http(HostKind::LinkHost), LinkHostConfig::default());
        assert!(adapter.supports(TargetType::Video));
        assert!(!adapter.supports(TargetType::Gif));
        assert_eq!(adapter.fallback_priority(TargetType::Gif), None);
        assert_eq!(adapter.fallback_priority(TargetType::Video), Some(2));
    }

    #[tokio::test]
    async fn test_analyze_makes_url_absolute() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/ab12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 2, "files": {"mp4": {"url": "//cdn.l.example.com/ab12.mp4"}}
            })))
            .mount(&server)
            .await;

        let source = SourceDescriptor::new(HostKind::LinkHost, "ab12", "https://l.example.com/ab12");
        let media = host(&server).analyze(&source).await.unwrap().unwrap();
        assert_eq!(media.media_url, "https://cdn.l.example.com/ab12.mp4");
    }

    #[tokio::test]
    async fn test_submit_and_poll() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"shortcode": "zz9", "status": 1})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videos/zz9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 2, "files": {}})))
            .mount(&server)
            .await;

        let adapter = host(&server);
        let artifact = MediaArtifact::new(vec![0u8; 32], HostKind::EmbeddedHost, EncodingType::Mp4);
        let submission = adapter
            .submit(&artifact, &UploadOptions::default().with_title("orig"))
            .await
            .unwrap();

        let Submission::Pending(ticket) = submission else {
            panic!("expected a ticket");
        };
        match adapter.poll(&ticket).await.unwrap() {
            PollStatus::Done(result) => assert_eq!(result.url, "https://l.example.com/zz9"),
            other => panic!("expected done, got {:?}", other),
        }
    }
}
