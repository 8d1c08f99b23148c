//! Scripted fakes for the host, probe and reversal seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use gifrev_hosts::{
    HostAdapter, HostError, HostRegistry, HostResult, PollStatus, Submission, UploadOptions,
    UploadTicket, Verification,
};
use gifrev_media::{MediaError, MediaResult, ProbeAdapter, ReversalAdapter};
use gifrev_models::{
    EncodingType, HostKind, MediaArtifact, MediaMetrics, SourceDescriptor, SourceMedia, TargetType,
    UploadResult,
};

/// Scripted answer to one submit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeSubmit {
    Publish,
    Ticket,
    ServerError,
    OverCapacity,
    Reject,
    BadRequest,
}

/// Scripted answer to one poll call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakePoll {
    Done,
    Processing,
    OverCapacity,
    ServerError,
}

/// Scripted answer to analyze.
#[derive(Debug, Clone)]
pub enum FakeAnalyze {
    Media(SourceMedia),
    Gone,
    Fail,
}

pub struct FakeHost {
    kind: HostKind,
    analyze: Mutex<FakeAnalyze>,
    submits: Mutex<VecDeque<FakeSubmit>>,
    default_submit: FakeSubmit,
    polls: Mutex<VecDeque<FakePoll>>,
    default_poll: FakePoll,
    removed: bool,
    video_encoding: EncodingType,
    pub analyze_calls: AtomicU32,
    pub fetch_calls: AtomicU32,
    pub submit_calls: AtomicU32,
    pub poll_calls: AtomicU32,
    pub verify_calls: AtomicU32,
    pub uploaded: Mutex<Vec<(EncodingType, UploadOptions)>>,
}

impl FakeHost {
    /// A host that publishes immediately and resolves sources to a short mp4.
    pub fn new(kind: HostKind) -> Self {
        Self {
            kind,
            analyze: Mutex::new(FakeAnalyze::Media(
                SourceMedia::new(format!("https://{}.example.com/m.mp4", kind), EncodingType::Mp4)
                    .with_gif_like(true),
            )),
            submits: Mutex::new(VecDeque::new()),
            default_submit: FakeSubmit::Publish,
            polls: Mutex::new(VecDeque::new()),
            default_poll: FakePoll::Done,
            removed: false,
            video_encoding: EncodingType::Mp4,
            analyze_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            verify_calls: AtomicU32::new(0),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    pub fn analyzing(self, analyze: FakeAnalyze) -> Self {
        *self.analyze.lock().unwrap() = analyze;
        self
    }

    /// Answers for the first submits; later ones get `default`.
    pub fn submitting(mut self, script: &[FakeSubmit], default: FakeSubmit) -> Self {
        self.submits = Mutex::new(script.iter().copied().collect());
        self.default_submit = default;
        self
    }

    pub fn polling(mut self, script: &[FakePoll], default: FakePoll) -> Self {
        self.polls = Mutex::new(script.iter().copied().collect());
        self.default_poll = default;
        self
    }

    pub fn removing(mut self) -> Self {
        self.removed = true;
        self
    }

    pub fn with_video_encoding(mut self, encoding: EncodingType) -> Self {
        self.video_encoding = encoding;
        self
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }

    fn result(&self, id: &str, nsfw: bool) -> UploadResult {
        UploadResult::new(self.kind, id, format!("https://{}.example.com/{}", self.kind, id)).with_nsfw(nsfw)
    }
}

#[async_trait]
impl HostAdapter for FakeHost {
    fn kind(&self) -> HostKind {
        self.kind
    }

    fn supports(&self, target: TargetType) -> bool {
        match self.kind {
            HostKind::ImageHost | HostKind::VideoHost => true,
            HostKind::LinkHost => target == TargetType::Video,
            HostKind::EmbeddedHost => false,
        }
    }

    fn fallback_priority(&self, target: TargetType) -> Option<u8> {
        match (self.kind, target) {
            (HostKind::ImageHost, TargetType::Video) => Some(0),
            (HostKind::VideoHost, TargetType::Gif) => Some(0),
            (HostKind::VideoHost, TargetType::Video) => Some(1),
            (HostKind::LinkHost, TargetType::Video) => Some(2),
            _ => None,
        }
    }

    fn video_encoding(&self) -> EncodingType {
        self.video_encoding
    }

    async fn analyze(&self, _source: &SourceDescriptor) -> HostResult<Option<SourceMedia>> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        match self.analyze.lock().unwrap().clone() {
            FakeAnalyze::Media(media) => Ok(Some(media)),
            FakeAnalyze::Gone => Ok(None),
            FakeAnalyze::Fail => Err(HostError::ServerError(502, "bad gateway".to_string())),
        }
    }

    async fn fetch(&self, _source: &SourceDescriptor, media: &SourceMedia) -> HostResult<MediaArtifact> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(MediaArtifact::new(Bytes::from_static(b"source"), self.kind, media.encoding).with_audio(media.has_audio))
    }

    async fn submit(&self, artifact: &MediaArtifact, options: &UploadOptions) -> HostResult<Submission> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.uploaded
            .lock()
            .unwrap()
            .push((artifact.encoding_type, options.clone()));
        let step = self.submits.lock().unwrap().pop_front().unwrap_or(self.default_submit);
        match step {
            FakeSubmit::Publish => Ok(Submission::Published(self.result(&format!("up{}", n), options.nsfw))),
            FakeSubmit::Ticket => Ok(Submission::Pending(UploadTicket::new(
                self.kind,
                format!("t{}", n),
                options.nsfw,
            ))),
            FakeSubmit::ServerError => Err(HostError::ServerError(500, "boom".to_string())),
            FakeSubmit::OverCapacity => Err(HostError::OverCapacity("over capacity".to_string())),
            FakeSubmit::Reject => Err(HostError::config("missing upload token")),
            FakeSubmit::BadRequest => Err(HostError::from_http_status(400, "Bad Request")),
        }
    }

    async fn verify(&self, _published: &UploadResult) -> HostResult<Verification> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(if self.removed {
            Verification::Removed
        } else {
            Verification::Live
        })
    }

    async fn poll(&self, ticket: &UploadTicket) -> HostResult<PollStatus> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.polls.lock().unwrap().pop_front().unwrap_or(self.default_poll);
        match step {
            FakePoll::Done => Ok(PollStatus::Done(self.result(&ticket.ticket, ticket.nsfw))),
            FakePoll::Processing => Ok(PollStatus::Processing),
            FakePoll::OverCapacity => Ok(PollStatus::OverCapacity),
            FakePoll::ServerError => Err(HostError::ServerError(500, "status unavailable".to_string())),
        }
    }
}

pub fn registry(hosts: Vec<FakeHost>) -> HostRegistry {
    hosts
        .into_iter()
        .fold(HostRegistry::new(), |registry, host| registry.with(Arc::new(host)))
}

/// Probe reporting fixed metrics, or failing.
pub struct FakeProbe {
    metrics: Option<MediaMetrics>,
    pub calls: AtomicU32,
}

impl FakeProbe {
    pub fn new(metrics: MediaMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            metrics: None,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ProbeAdapter for FakeProbe {
    async fn probe(&self, bytes: &Bytes) -> MediaResult<MediaMetrics> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.metrics {
            Some(metrics) if metrics.size_bytes.is_some() => Ok(metrics.clone()),
            Some(metrics) => Ok(metrics.clone().with_size(bytes.len() as u64)),
            None => Err(MediaError::invalid_media("No duration reported")),
        }
    }
}

/// Reverser that reverses the byte order and records every call.
#[derive(Default)]
pub struct FakeReverser {
    pub calls: Mutex<Vec<(EncodingType, EncodingType)>>,
}

impl FakeReverser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReversalAdapter for FakeReverser {
    async fn reverse(&self, artifact: &MediaArtifact, target: EncodingType) -> MediaResult<MediaArtifact> {
        self.calls
            .lock()
            .unwrap()
            .push((artifact.encoding_type, target));
        let mut bytes = artifact.bytes.to_vec();
        bytes.reverse();
        Ok(artifact.reversed(bytes, target))
    }
}
