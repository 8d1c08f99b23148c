//! Image/video CDN adapter.
//!
//! Uploads go through the anonymous album flow: a captcha check creates an
//! album, then the file is posted into it. Gifs come back as a direct hash;
//! videos come back as a processing ticket that has to be polled.

use async_trait::async_trait;
use gifrev_models::{
    EncodingType, HostKind, MediaArtifact, SourceDescriptor, SourceMedia, TargetType, UploadResult,
};
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapter::{HostAdapter, PollStatus, Submission, UploadOptions, UploadTicket, Verification};
use crate::config::ImageHostConfig;
use crate::error::{mentions_over_capacity, HostError, HostResult};
use crate::http::HostHttp;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    id: String,
    link: String,
    #[serde(default)]
    animated: bool,
    mp4: Option<String>,
    #[serde(default)]
    has_sound: bool,
}

#[derive(Debug, Deserialize)]
struct AlbumInfo {
    new_album_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadInfo {
    hash: Option<String>,
    ticket: Option<String>,
}

pub struct ImageHost {
    http: HostHttp,
    config: ImageHostConfig,
}

impl ImageHost {
    pub fn new(http: HostHttp, config: ImageHostConfig) -> Self {
        Self { http, config }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.config.client_id {
            Some(id) => request.header(AUTHORIZATION, format!("Client-ID {}", id)),
            None => request,
        };
        match &self.config.cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    async fn create_album(&self) -> HostResult<String> {
        let request = self.authorized(
            self.http
                .client()
                .post(format!("{}/upload/checkcaptcha", self.config.upload_base))
                .form(&[("total_uploads", "1"), ("create_album", "true")]),
        );
        let album: Envelope<AlbumInfo> = self.http.json("create_album", request).await?;
        Ok(album.data.new_album_id)
    }
}

#[async_trait]
impl HostAdapter for ImageHost {
    fn kind(&self) -> HostKind {
        HostKind::ImageHost
    }

    fn supports(&self, _target: TargetType) -> bool {
        true
    }

    fn fallback_priority(&self, target: TargetType) -> Option<u8> {
        // Its gif encoder bloats long clips, so it is only a gif primary.
        match target {
            TargetType::Video => Some(0),
            TargetType::Gif => None,
        }
    }

    async fn analyze(&self, source: &SourceDescriptor) -> HostResult<Option<SourceMedia>> {
        let request = self.authorized(self.http.client().get(format!(
            "{}/image/{}",
            self.config.api_base,
            urlencoding::encode(&source.id)
        )));
        let Some(info) = self
            .http
            .json_or_none::<Envelope<ImageInfo>>("analyze", request)
            .await?
        else {
            return Ok(None);
        };
        let image = info.data;

        if !image.animated {
            let encoding = EncodingType::from_url(&image.link).unwrap_or(EncodingType::Gif);
            return Ok(Some(SourceMedia::new(image.link, encoding).with_animated(false)));
        }

        let media_url = image
            .mp4
            .unwrap_or_else(|| format!("{}/{}.mp4", self.config.media_base, image.id));
        Ok(Some(
            SourceMedia::new(media_url, EncodingType::Mp4)
                .with_gif_like(true)
                .with_audio(image.has_sound),
        ))
    }

    async fn fetch(&self, source: &SourceDescriptor, media: &SourceMedia) -> HostResult<MediaArtifact> {
        self.http.fetch_artifact(source, media).await
    }

    async fn submit(&self, artifact: &MediaArtifact, options: &UploadOptions) -> HostResult<Submission> {
        let album_id = self.create_album().await?;

        let encoding = artifact.encoding_type;
        let file = Part::stream_with_length(Body::from(artifact.bytes.clone()), artifact.bytes.len() as u64)
            .file_name(format!("reversed.{}", encoding.extension()))
            .mime_str(encoding.mime_type())?;
        let form = Form::new().text("new_album_id", album_id).part("Filedata", file);

        let request = self.authorized(
            self.http
                .client()
                .post(format!("{}/upload", self.config.upload_base))
                .multipart(form),
        );
        let body = self.http.text("upload", request).await?;
        if mentions_over_capacity(&body) {
            return Err(HostError::OverCapacity(body));
        }

        let upload: Envelope<UploadInfo> = serde_json::from_str(&body)?;
        if !upload.success {
            return Err(HostError::rejected(format!("upload refused: {}", body)));
        }

        match (upload.data.ticket, upload.data.hash) {
            (Some(ticket), _) => {
                debug!(ticket = %ticket, "Upload queued for processing");
                Ok(Submission::Pending(UploadTicket::new(HostKind::ImageHost, ticket, options.nsfw)))
            }
            (None, Some(hash)) => {
                let url = format!("{}/{}.{}", self.config.media_base, hash, encoding.extension());
                Ok(Submission::Published(
                    UploadResult::new(HostKind::ImageHost, hash, url).with_nsfw(options.nsfw),
                ))
            }
            (None, None) => Err(HostError::invalid_response("upload returned neither hash nor ticket")),
        }
    }

    async fn verify(&self, published: &UploadResult) -> HostResult<Verification> {
        match self.http.final_url("verify", &published.url).await? {
            Some(url) if url == self.config.removed_url => {
                warn!(id = %published.id, "Upload resolved to the removed placeholder");
                Ok(Verification::Removed)
            }
            Some(_) => Ok(Verification::Live),
            None => Ok(Verification::Removed),
        }
    }

    async fn poll(&self, ticket: &UploadTicket) -> HostResult<PollStatus> {
        let request = self.authorized(
            self.http
                .client()
                .get(format!("{}/upload/poll", self.config.upload_base))
                .query(&[("tickets[]", ticket.ticket.as_str())]),
        );
        let body = self.http.text("poll", request).await?;
        if mentions_over_capacity(&body) {
            return Ok(PollStatus::OverCapacity);
        }

        let status: serde_json::Value = serde_json::from_str(&body)?;
        if !status["success"].as_bool().unwrap_or(false) {
            return Err(HostError::rejected(format!("ticket {} failed: {}", ticket.ticket, body)));
        }

        // `done` is an empty list until the ticket resolves, then a map of ticket to id.
        match status["data"]["done"][ticket.ticket.as_str()].as_str() {
            Some(id) => Ok(PollStatus::Done(
                UploadResult::new(HostKind::ImageHost, id, format!("{}/{}", self.config.upload_base, id))
                    .with_nsfw(ticket.nsfw),
            )),
            None => Ok(PollStatus::Processing),
        }
    }
}
