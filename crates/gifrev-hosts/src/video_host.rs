//! Higher-capacity video CDN adapter.

use async_trait::async_trait;
use gifrev_models::{
    EncodingType, HostKind, MediaArtifact, SourceDescriptor, SourceMedia, TargetType, UploadResult,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::Body;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::{HostAdapter, PollStatus, Submission, UploadOptions, UploadTicket};
use crate::config::VideoHostConfig;
use crate::error::{mentions_over_capacity, HostError, HostResult};
use crate::http::HostHttp;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemEnvelope {
    gfy_item: Item,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    mp4_url: String,
    #[serde(default)]
    has_audio: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    nsfw: u8,
    keep_audio: bool,
    no_md5: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    #[serde(default)]
    is_ok: bool,
    gfyname: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    task: String,
    gfyname: Option<String>,
    error_message: Option<serde_json::Value>,
}

pub struct VideoHost {
    http: HostHttp,
    config: VideoHostConfig,
}

impl VideoHost {
    pub fn new(http: HostHttp, config: VideoHostConfig) -> Self {
        Self { http, config }
    }

    fn token(&self) -> HostResult<&str> {
        self.config
            .access_token
            .as_deref()
            .ok_or_else(|| HostError::config("VIDEO_HOST_ACCESS_TOKEN is not set"))
    }
}

#[async_trait]
impl HostAdapter for VideoHost {
    fn kind(&self) -> HostKind {
        HostKind::VideoHost
    }

    fn supports(&self, _target: TargetType) -> bool {
        true
    }

    fn fallback_priority(&self, target: TargetType) -> Option<u8> {
        match target {
            TargetType::Gif => Some(0),
            TargetType::Video => Some(1),
        }
    }

    async fn analyze(&self, source: &SourceDescriptor) -> HostResult<Option<SourceMedia>> {
        let request = self.http.client().get(format!(
            "{}/gfycats/{}",
            self.config.api_base,
            urlencoding::encode(&source.id)
        ));
        let item = self
            .http
            .json_or_none::<ItemEnvelope>("analyze", request)
            .await?
            .map(|envelope| envelope.gfy_item);

        Ok(item.map(|item| SourceMedia::new(item.mp4_url, EncodingType::Mp4).with_audio(item.has_audio)))
    }

    async fn fetch(&self, source: &SourceDescriptor, media: &SourceMedia) -> HostResult<MediaArtifact> {
        self.http.fetch_artifact(source, media).await
    }

    async fn submit(&self, artifact: &MediaArtifact, options: &UploadOptions) -> HostResult<Submission> {
        let token = self.token()?;

        let create = CreateRequest {
            title: options.title.as_deref(),
            nsfw: u8::from(options.nsfw),
            keep_audio: artifact.has_audio,
            no_md5: true,
        };
        let request = self
            .http
            .client()
            .post(format!("{}/gfycats", self.config.api_base))
            .bearer_auth(token)
            .json(&create);
        let created: CreateResponse = self.http.json("create", request).await?;
        let gfyname = match created.gfyname {
            Some(name) if created.is_ok => name,
            _ => return Err(HostError::rejected("upload key was not issued")),
        };

        let request = self
            .http
            .client()
            .put(format!("{}/{}", self.config.upload_base, gfyname))
            .header(CONTENT_TYPE, artifact.encoding_type.mime_type())
            .body(Body::from(artifact.bytes.clone()));
        self.http.text("file_drop", request).await?;

        debug!(gfyname = %gfyname, size = artifact.len(), "File dropped");
        Ok(Submission::Pending(UploadTicket::new(
            HostKind::VideoHost,
            gfyname,
            options.nsfw,
        )))
    }

    async fn poll(&self, ticket: &UploadTicket) -> HostResult<PollStatus> {
        let request = self.http.client().get(format!(
            "{}/gfycats/fetch/status/{}",
            self.config.api_base, ticket.ticket
        ));
        let body = self.http.text("poll", request).await?;
        if mentions_over_capacity(&body) {
            return Ok(PollStatus::OverCapacity);
        }

        let status: StatusResponse = serde_json::from_str(&body)?;
        match status.task.as_str() {
            "complete" => {
                let id = status.gfyname.unwrap_or_else(|| ticket.ticket.clone());
                let url = format!("{}/{}", self.config.page_base, id);
                Ok(PollStatus::Done(
                    UploadResult::new(HostKind::VideoHost, id, url).with_nsfw(ticket.nsfw),
                ))
            }
            // The drop can take a moment to register, which reads as not found.
            "encoding" | "NotFoundo" => Ok(PollStatus::Processing),
            "error" => Err(HostError::rejected(format!(
                "encoding failed for {}: {}",
                ticket.ticket,
                status.error_message.unwrap_or_default()
            ))),
            other => Err(HostError::invalid_response(format!("unknown task state {}", other))),
        }
    }
}
