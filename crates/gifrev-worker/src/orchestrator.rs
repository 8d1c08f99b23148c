//! Upload state machine: submit, then verify or poll, with bounded retry.

use std::future::Future;
use std::time::Duration;

use gifrev_hosts::{HostAdapter, HostError, PollStatus, Submission, UploadOptions, UploadTicket, Verification};
use gifrev_models::{MediaArtifact, UploadResult};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::UploadPolicy;
use crate::error::UploadError;
use crate::metrics;

/// How one full attempt (submit plus verify or poll) ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Done(UploadResult),
    /// Transient failure, retried after the plain delay
    Failed(String),
    /// The host is saturated, retried after the capacity delay
    OverCapacity,
    /// The adapter can never complete this upload; retrying cannot help
    Rejected(String),
}

impl AttemptOutcome {
    /// Any network or HTTP failure is worth another attempt. Only local
    /// conditions stop the sequence early.
    pub fn from_error(error: &HostError) -> Self {
        match error {
            e if e.is_over_capacity() => AttemptOutcome::OverCapacity,
            HostError::Config(_) | HostError::Unsupported(_) | HostError::TooLarge(_) => {
                AttemptOutcome::Rejected(error.to_string())
            }
            _ => AttemptOutcome::Failed(error.to_string()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Done(_) => "done",
            AttemptOutcome::Failed(_) => "failed",
            AttemptOutcome::OverCapacity => "over_capacity",
            AttemptOutcome::Rejected(_) => "rejected",
        }
    }
}

/// Drives one artifact onto one host.
#[derive(Debug, Clone, Default)]
pub struct UploadOrchestrator {
    policy: UploadPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl UploadOrchestrator {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy, cancel: None }
    }

    /// Abort any wait or in-flight call once `cancel` turns true.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Run up to `max_attempts` attempts on `host`.
    ///
    /// Artifact bytes are shared and immutable, so every attempt re-reads the
    /// whole buffer from the start.
    pub async fn run(
        &self,
        host: &dyn HostAdapter,
        artifact: &MediaArtifact,
        options: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let kind = host.kind();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last = String::new();

        for attempt in 1..=max_attempts {
            let outcome = self.cancellable(self.attempt(host, artifact, options)).await?;
            metrics::record_upload_attempt(kind, outcome.label());

            let delay = match outcome {
                AttemptOutcome::Done(result) => {
                    info!(host = %kind, attempt, url = %result.url, "Upload published");
                    return Ok(result);
                }
                AttemptOutcome::Failed(reason) => {
                    warn!(host = %kind, attempt, max_attempts, "Upload attempt failed: {}", reason);
                    last = reason;
                    self.policy.retry_delay
                }
                AttemptOutcome::OverCapacity => {
                    warn!(host = %kind, attempt, max_attempts, "Host over capacity");
                    last = format!("{} over capacity", kind);
                    self.policy.capacity_delay
                }
                AttemptOutcome::Rejected(reason) => {
                    warn!(host = %kind, attempt, "Upload rejected: {}", reason);
                    return Err(UploadError::Exhausted {
                        host: kind,
                        attempts: attempt,
                        last: reason,
                    });
                }
            };

            if attempt < max_attempts {
                debug!(host = %kind, delay_secs = delay.as_secs(), "Waiting before next attempt");
                self.wait(delay).await?;
            }
        }

        Err(UploadError::Exhausted {
            host: kind,
            attempts: max_attempts,
            last,
        })
    }

    async fn attempt(
        &self,
        host: &dyn HostAdapter,
        artifact: &MediaArtifact,
        options: &UploadOptions,
    ) -> AttemptOutcome {
        let submission = match host.submit(artifact, options).await {
            Ok(submission) => submission,
            Err(e) => return AttemptOutcome::from_error(&e),
        };

        match submission {
            Submission::Published(result) => match host.verify(&result).await {
                Ok(Verification::Live) => AttemptOutcome::Done(result),
                Ok(Verification::Removed) => {
                    AttemptOutcome::Failed(format!("{} replaced {} with its removed placeholder", host.kind(), result.url))
                }
                Err(e) => AttemptOutcome::from_error(&e),
            },
            Submission::Pending(ticket) => self.poll(host, &ticket).await,
        }
    }

    /// Check a ticket until it resolves. A capacity signal ends the attempt
    /// without counting as a check.
    async fn poll(&self, host: &dyn HostAdapter, ticket: &UploadTicket) -> AttemptOutcome {
        let kind = host.kind();

        for check in 1..=self.policy.max_poll_checks {
            tokio::time::sleep(self.policy.poll_interval).await;

            let status = match host.poll(ticket).await {
                Ok(PollStatus::OverCapacity) => return AttemptOutcome::OverCapacity,
                Err(e) if e.is_over_capacity() => return AttemptOutcome::OverCapacity,
                other => other,
            };
            metrics::record_poll_check(kind);

            match status {
                Ok(PollStatus::Done(result)) => return AttemptOutcome::Done(result),
                Ok(_) => debug!(host = %kind, ticket = %ticket.ticket, check, "Still processing"),
                Err(e) => return AttemptOutcome::from_error(&e),
            }
        }

        AttemptOutcome::Failed(format!(
            "ticket {} still processing after {} checks",
            ticket.ticket, self.policy.max_poll_checks
        ))
    }

    async fn wait(&self, delay: Duration) -> Result<(), UploadError> {
        self.cancellable(tokio::time::sleep(delay)).await
    }

    async fn cancellable<F: Future>(&self, fut: F) -> Result<F::Output, UploadError> {
        let Some(cancel) = &self.cancel else {
            return Ok(fut.await);
        };
        let mut cancel = cancel.clone();
        if *cancel.borrow() {
            return Err(UploadError::Cancelled);
        }

        tokio::select! {
            output = fut => Ok(output),
            _ = cancelled(&mut cancel) => Err(UploadError::Cancelled),
        }
    }
}

/// Resolves once the flag turns true. A dropped sender never cancels.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeHost, FakePoll, FakeSubmit};
    use gifrev_models::{EncodingType, HostKind};
    use tokio::time::Instant;

    fn artifact() -> MediaArtifact {
        MediaArtifact::new(&b"reversed"[..], HostKind::ImageHost, EncodingType::Mp4)
    }

    async fn run(host: &FakeHost) -> Result<UploadResult, UploadError> {
        UploadOrchestrator::new(UploadPolicy::default())
            .run(host, &artifact(), &UploadOptions::new(false))
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_published_and_live_is_done() {
        let host = FakeHost::new(HostKind::ImageHost);
        let result = run(&host).await.unwrap();
        assert_eq!(result.host, HostKind::ImageHost);
        assert_eq!(FakeHost::count(&host.submit_calls), 1);
        assert_eq!(FakeHost::count(&host.verify_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_more_than_three_attempts() {
        let host = FakeHost::new(HostKind::VideoHost).submitting(&[], FakeSubmit::ServerError);
        let err = run(&host).await.unwrap_err();
        assert!(matches!(err, UploadError::Exhausted { attempts: 3, .. }));
        assert_eq!(FakeHost::count(&host.submit_calls), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_retry_waits_thirty_seconds() {
        let host = FakeHost::new(HostKind::VideoHost).submitting(&[FakeSubmit::ServerError], FakeSubmit::Publish);
        let start = Instant::now();
        run(&host).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(FakeHost::count(&host.submit_calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_capacity_waits_ninety_seconds() {
        let host = FakeHost::new(HostKind::ImageHost).submitting(&[FakeSubmit::OverCapacity], FakeSubmit::Publish);
        let start = Instant::now();
        run(&host).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_last_attempt() {
        let host = FakeHost::new(HostKind::VideoHost).submitting(&[], FakeSubmit::ServerError);
        let start = Instant::now();
        run(&host).await.unwrap_err();
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_placeholder_is_a_failed_attempt() {
        let host = FakeHost::new(HostKind::ImageHost).removing();
        let err = run(&host).await.unwrap_err();
        match err {
            UploadError::Exhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("removed"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_stops_early() {
        let host = FakeHost::new(HostKind::LinkHost).submitting(&[], FakeSubmit::Reject);
        let err = run(&host).await.unwrap_err();
        assert!(matches!(err, UploadError::Exhausted { attempts: 1, .. }));
        assert_eq!(FakeHost::count(&host.submit_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_client_error_is_retried() {
        let host = FakeHost::new(HostKind::ImageHost).submitting(&[FakeSubmit::BadRequest], FakeSubmit::Publish);
        let start = Instant::now();
        let result = run(&host).await.unwrap();
        assert_eq!(result.host, HostKind::ImageHost);
        assert_eq!(FakeHost::count(&host.submit_calls), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticket_resolves_after_processing() {
        let host = FakeHost::new(HostKind::VideoHost)
            .submitting(&[], FakeSubmit::Ticket)
            .polling(&[FakePoll::Processing, FakePoll::Processing], FakePoll::Done);
        let start = Instant::now();
        let result = run(&host).await.unwrap();
        assert_eq!(result.id, "t1");
        assert_eq!(FakeHost::count(&host.poll_calls), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_more_than_fifteen_checks_per_attempt() {
        let host = FakeHost::new(HostKind::VideoHost)
            .submitting(&[], FakeSubmit::Ticket)
            .polling(&[], FakePoll::Processing);
        let err = run(&host).await.unwrap_err();
        assert!(matches!(err, UploadError::Exhausted { attempts: 3, .. }));
        assert_eq!(FakeHost::count(&host.submit_calls), 3);
        assert_eq!(FakeHost::count(&host.poll_calls), 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_during_polling_restarts_attempt() {
        let host = FakeHost::new(HostKind::ImageHost)
            .submitting(&[], FakeSubmit::Ticket)
            .polling(&[FakePoll::Processing, FakePoll::OverCapacity], FakePoll::Done);
        let start = Instant::now();
        let result = run(&host).await.unwrap();
        assert_eq!(result.id, "t2");
        assert_eq!(FakeHost::count(&host.submit_calls), 2);
        // Two checks, the capacity back-off, then one check on the new ticket.
        assert_eq!(start.elapsed(), Duration::from_secs(10 + 90 + 5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_fails_attempt() {
        let host = FakeHost::new(HostKind::VideoHost)
            .submitting(&[], FakeSubmit::Ticket)
            .polling(&[FakePoll::ServerError], FakePoll::Done);
        let result = run(&host).await.unwrap();
        assert_eq!(FakeHost::count(&host.submit_calls), 2);
        assert_eq!(result.id, "t2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let (tx, rx) = watch::channel(false);
        let host = FakeHost::new(HostKind::VideoHost).submitting(&[], FakeSubmit::ServerError);
        let orchestrator = UploadOrchestrator::new(UploadPolicy::default()).with_cancel(rx);

        let cancel = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            tx.send(true).unwrap();
        };
        let artifact = artifact();
        let options = UploadOptions::new(false);
        let (result, _) = tokio::join!(orchestrator.run(&host, &artifact, &options), cancel);

        assert_eq!(result.unwrap_err(), UploadError::Cancelled);
        assert_eq!(FakeHost::count(&host.submit_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_never_submits() {
        let (_tx, rx) = watch::channel(true);
        let host = FakeHost::new(HostKind::ImageHost);
        let result = UploadOrchestrator::new(UploadPolicy::default())
            .with_cancel(rx)
            .run(&host, &artifact(), &UploadOptions::new(false))
            .await;
        assert_eq!(result.unwrap_err(), UploadError::Cancelled);
        assert_eq!(FakeHost::count(&host.submit_calls), 0);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            AttemptOutcome::from_error(&HostError::OverCapacity("busy".into())),
            AttemptOutcome::OverCapacity
        );
        assert!(matches!(
            AttemptOutcome::from_error(&HostError::ServerError(502, "".into())),
            AttemptOutcome::Failed(_)
        ));
        assert!(matches!(
            AttemptOutcome::from_error(&HostError::from_http_status(413, "too big")),
            AttemptOutcome::Failed(_)
        ));
        assert!(matches!(
            AttemptOutcome::from_error(&HostError::from_http_status(404, "gone")),
            AttemptOutcome::Failed(_)
        ));
        assert!(matches!(
            AttemptOutcome::from_error(&HostError::config("missing token")),
            AttemptOutcome::Rejected(_)
        ));
        assert!(matches!(
            AttemptOutcome::from_error(&HostError::unsupported("uploads")),
            AttemptOutcome::Rejected(_)
        ));
    }
}
