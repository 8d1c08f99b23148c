//! Shared HTTP plumbing for the host adapters.

use std::time::Instant;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use gifrev_models::{HostKind, MediaArtifact, SourceDescriptor, SourceMedia};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info_span, Instrument};

use crate::config::HttpConfig;
use crate::error::{HostError, HostResult};
use crate::metrics::{record_download, record_request};

/// Build the pooled client shared by every adapter.
pub fn build_client(config: &HttpConfig) -> HostResult<Client> {
    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(10)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(HostError::Network)
}

/// A host-scoped view of the shared client with request instrumentation.
#[derive(Debug, Clone)]
pub struct HostHttp {
    client: Client,
    host: HostKind,
    max_download_bytes: u64,
}

impl HostHttp {
    pub fn new(client: Client, host: HostKind, config: &HttpConfig) -> Self {
        Self {
            client,
            host,
            max_download_bytes: config.max_download_bytes,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Run a request future inside a span and record its metrics.
    pub async fn execute<T, F>(&self, operation: &str, fut: F) -> HostResult<T>
    where
        F: std::future::Future<Output = HostResult<T>>,
    {
        let span = info_span!("host_request", host = %self.host, operation = %operation);
        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(self.host.as_str(), operation, status, latency_ms);

        result
    }

    /// Send a request and decode a JSON body. A 404 is `Ok(None)`.
    pub async fn json_or_none<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> HostResult<Option<T>> {
        self.execute(operation, async {
            let response = request.send().await?;
            match response.status() {
                StatusCode::NOT_FOUND | StatusCode::GONE => Ok(None),
                s if s.is_success() => Ok(Some(response.json().await?)),
                _ => Err(error_from_response(response).await),
            }
        })
        .await
    }

    /// Send a request and decode a JSON body.
    pub async fn json<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> HostResult<T> {
        self.execute(operation, async {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }
            Ok(response.json().await?)
        })
        .await
    }

    /// Send a request and return the raw body text of a success response.
    pub async fn text(&self, operation: &str, request: RequestBuilder) -> HostResult<String> {
        self.execute(operation, async {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }
            Ok(response.text().await?)
        })
        .await
    }

    /// Follow redirects from `url` and return where they end. A 404 is `Ok(None)`.
    pub async fn final_url(&self, operation: &str, url: &str) -> HostResult<Option<String>> {
        self.execute(operation, async {
            let response = self.client.get(url).send().await?;
            match response.status() {
                StatusCode::NOT_FOUND | StatusCode::GONE => Ok(None),
                s if s.is_success() => Ok(Some(response.url().to_string())),
                _ => Err(error_from_response(response).await),
            }
        })
        .await
    }

    /// Stream `url` into memory, enforcing the download cap.
    pub async fn download(&self, url: &str) -> HostResult<Bytes> {
        let bytes = self
            .execute("download", async {
                let response = self.client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(error_from_response(response).await);
                }

                if let Some(len) = response.content_length() {
                    if len > self.max_download_bytes {
                        return Err(HostError::TooLarge(len));
                    }
                }

                let mut stream = response.bytes_stream();
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    let total = (buf.len() + chunk.len()) as u64;
                    if total > self.max_download_bytes {
                        return Err(HostError::TooLarge(total));
                    }
                    buf.extend_from_slice(&chunk);
                }
                Ok(buf.freeze())
            })
            .await?;

        debug!(host = %self.host, url = %url, size = bytes.len(), "Downloaded source media");
        record_download(self.host.as_str(), bytes.len() as u64);
        Ok(bytes)
    }

    /// Download resolved source media into an artifact.
    pub async fn fetch_artifact(&self, source: &SourceDescriptor, media: &SourceMedia) -> HostResult<MediaArtifact> {
        let bytes = self.download(&media.media_url).await?;
        Ok(MediaArtifact::new(bytes, source.host, media.encoding).with_audio(media.has_audio))
    }
}

#[cfg(test)]
pub(crate) fn test_http(host: HostKind) -> HostHttp {
    let config = HttpConfig::default();
    HostHttp::new(build_client(&config).unwrap(), host, &config)
}

/// Turn a failed response into a classified error.
pub async fn error_from_response(response: Response) -> HostError {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    HostError::from_http_status(status, format!("{} failed: {}", url, body))
}
