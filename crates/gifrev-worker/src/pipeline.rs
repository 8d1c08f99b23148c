//! End-to-end reversal of one source.
//!
//! Dedup lookup, then on a miss: resolve and fetch the source, probe it,
//! pick an encoding and uploader, reverse, upload with one fallback, and
//! record the published result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use gifrev_hosts::{HostAdapter, HostError, HostRegistry, UploadOptions};
use gifrev_media::{MediaError, ProbeAdapter, ReversalAdapter};
use gifrev_models::{
    AnalysisResult, EncodingType, MediaArtifact, Outcome, ReverseRequest, SourceDescriptor, TargetType,
    UploadResult,
};
use gifrev_queue::{JobQueue, QueueError, ReverseJob};
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

use crate::analyzer::FormatAnalyzer;
use crate::dedup::DedupCache;
use crate::error::{UploadError, WorkerError, WorkerResult};
use crate::metrics;
use crate::orchestrator::UploadOrchestrator;
use crate::selector::HostSelector;

pub struct Pipeline {
    hosts: HostRegistry,
    selector: HostSelector,
    analyzer: FormatAnalyzer,
    probe: Arc<dyn ProbeAdapter>,
    reverser: Arc<dyn ReversalAdapter>,
    orchestrator: UploadOrchestrator,
    dedup: DedupCache,
    queue: Option<Arc<JobQueue>>,
}

impl Pipeline {
    pub fn new(
        hosts: HostRegistry,
        probe: Arc<dyn ProbeAdapter>,
        reverser: Arc<dyn ReversalAdapter>,
        dedup: DedupCache,
    ) -> Self {
        Self {
            selector: HostSelector::new(hosts.clone()),
            hosts,
            analyzer: FormatAnalyzer::default(),
            probe,
            reverser,
            orchestrator: UploadOrchestrator::default(),
            dedup,
            queue: None,
        }
    }

    pub fn with_orchestrator(mut self, orchestrator: UploadOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Defer `submit`ted requests to this queue.
    pub fn with_queue(mut self, queue: Arc<JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Stop upload retries and back-off waits once `cancel` turns true.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.orchestrator = self.orchestrator.with_cancel(cancel);
        self
    }

    /// Accept a request: queue it when a queue is configured, otherwise
    /// process it inline.
    pub async fn submit(&self, request: ReverseRequest) -> Outcome {
        if !request.source.is_analyzable() {
            return Outcome::UserFailure;
        }
        let Some(queue) = &self.queue else {
            return self.handle(&request).await;
        };

        let job = ReverseJob::new(request);
        match queue.enqueue(&job).await {
            Ok(message_id) => {
                info!(job_id = %job.job_id, message_id = %message_id, source = %job.request.source, "Queued reversal");
                Outcome::accepted()
            }
            Err(QueueError::Duplicate(key)) => {
                info!(key = %key, "Reversal already queued");
                Outcome::accepted()
            }
            Err(e) => {
                warn!(source = %job.request.source, "Enqueue failed, processing inline: {}", e);
                self.handle(&job.request).await
            }
        }
    }

    /// Process a request and report only its outcome. Failure detail goes to
    /// the log.
    pub async fn handle(&self, request: &ReverseRequest) -> Outcome {
        match self.run(request).await {
            Ok(result) => Outcome::published(result),
            Err(e) => e.outcome(),
        }
    }

    /// Process a request, keeping the failure for callers that act on it.
    pub async fn run(&self, request: &ReverseRequest) -> WorkerResult<UploadResult> {
        let source = &request.source;
        let span = info_span!(
            "reverse_request",
            host = %source.host,
            source_id = %source.id,
            nsfw = source.nsfw,
            reupload = request.reupload
        );

        let start = Instant::now();
        let result = self.process(request).instrument(span.clone()).await;
        let outcome = match &result {
            Ok(published) => Outcome::published(published.clone()),
            Err(e) => e.outcome(),
        };

        span.in_scope(|| match &result {
            Ok(published) => info!(url = %published.url, "Reversal published"),
            Err(e) => warn!(outcome = outcome.as_str(), "Reversal failed: {}", e),
        });
        metrics::record_request(outcome.as_str(), start.elapsed());
        result
    }

    async fn process(&self, request: &ReverseRequest) -> WorkerResult<UploadResult> {
        let source = &request.source;
        if !source.is_analyzable() {
            return Err(WorkerError::invalid_source("empty source id"));
        }

        match self.dedup.lookup(source).await {
            Ok(Some(record)) if !request.reupload => {
                info!(url = %record.result.url, "Serving cached reversal");
                return Ok(record.result);
            }
            Ok(Some(record)) => {
                if self.still_published(&record.result).await {
                    info!(url = %record.result.url, "Cached reversal still live");
                    return Ok(record.result);
                }
                info!(url = %record.result.url, "Cached reversal is gone, reprocessing");
                if let Err(e) = self.dedup.invalidate(source).await {
                    warn!("Failed to invalidate stale record: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Dedup lookup failed, treating as miss: {}", e),
        }

        let result = self.reverse_and_publish(source).await?;

        if let Err(e) = self.dedup.store(source, &result).await {
            warn!(url = %result.url, "Failed to record reversal: {}", e);
        }
        Ok(result)
    }

    /// Re-run analysis against the cached destination.
    async fn still_published(&self, result: &UploadResult) -> bool {
        let Some(host) = self.hosts.get(result.host) else {
            return false;
        };
        match host.analyze(&result.as_source()).await {
            Ok(media) => media.is_some(),
            Err(e) => {
                warn!(host = %result.host, "Re-validation failed: {}", e);
                false
            }
        }
    }

    async fn reverse_and_publish(&self, source: &SourceDescriptor) -> WorkerResult<UploadResult> {
        let origin = self
            .hosts
            .get(source.host)
            .ok_or_else(|| WorkerError::unsupported_source(format!("no adapter for {}", source.host)))?;

        let media = match origin.analyze(source).await {
            Ok(Some(media)) => media,
            Ok(None) => return Err(WorkerError::SourceUnavailable(HostError::not_found(source.to_string()))),
            Err(HostError::Unsupported(msg)) => return Err(WorkerError::UnsupportedSource(msg)),
            Err(e) => return Err(WorkerError::SourceUnavailable(e)),
        };
        if !media.animated {
            return Err(WorkerError::unsupported_source(format!("{} is not animated", source)));
        }

        let original = origin
            .fetch(source, &media)
            .await
            .map_err(WorkerError::SourceUnavailable)?;
        let metrics = self.probe.probe(&original.bytes).await.map_err(|e| match e {
            MediaError::Cancelled => WorkerError::Cancelled,
            e => WorkerError::ProbeFailure(e),
        })?;
        let original = original
            .with_duration(Some(metrics.duration_seconds))
            .with_frame_count(metrics.frame_count());

        let analysis = self.analyzer.analyze(&media, &metrics);
        info!(
            duration = metrics.duration_seconds,
            size = ?metrics.size_bytes,
            target = %analysis.target_type,
            primary = %analysis.primary_uploader,
            "Analyzed source"
        );

        let options = UploadOptions::new(source.nsfw).with_title(source.url.clone());
        let primary = self.selector.primary(&analysis)?;
        let reversed = self.reverse(&original, target_encoding(&analysis, primary.as_ref())).await?;

        let exhausted = match self.orchestrator.run(primary.as_ref(), &reversed, &options).await {
            Ok(result) => return Ok(result),
            Err(UploadError::Cancelled) => return Err(WorkerError::Cancelled),
            Err(e) => e,
        };

        let failed = HashSet::from([primary.kind()]);
        let Ok(fallback) = self.selector.fallback(&analysis, &failed) else {
            return Err(exhausted.into());
        };
        warn!(failed = %primary.kind(), fallback = %fallback.kind(), "{}; trying fallback", exhausted);

        let encoding = target_encoding(&analysis, fallback.as_ref());
        let reversed = if encoding == reversed.encoding_type {
            reversed
        } else {
            self.reverse(&original, encoding).await?
        };

        Ok(self.orchestrator.run(fallback.as_ref(), &reversed, &options).await?)
    }

    async fn reverse(&self, original: &MediaArtifact, encoding: EncodingType) -> WorkerResult<MediaArtifact> {
        self.reverser.reverse(original, encoding).await.map_err(|e| match e {
            MediaError::Cancelled => WorkerError::Cancelled,
            e => WorkerError::ReversalFailure(e),
        })
    }
}

/// Container the reversal is written in for a given uploader.
fn target_encoding(analysis: &AnalysisResult, uploader: &dyn HostAdapter) -> EncodingType {
    match analysis.target_type {
        TargetType::Gif => EncodingType::Gif,
        TargetType::Video => uploader.video_encoding(),
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("hosts", &self.hosts)
            .field("selector", &self.selector)
            .field("dedup", &self.dedup)
            .field("queued", &self.queue.is_some())
            .finish()
    }
}
