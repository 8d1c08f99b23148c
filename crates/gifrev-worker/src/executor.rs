//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use gifrev_models::{Outcome, UploadResult};
use gifrev_queue::{JobQueue, ReverseJob};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::pipeline::Pipeline;

/// What to do with a stream message once its job finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Ack: the job is settled, published or not
    Settle,
    /// Leave pending for redelivery after counting the failure
    Retry,
    /// Move to the dead-letter stream right away
    DeadLetter,
    /// Leave pending without counting: the worker is stopping
    Release,
}

impl Disposition {
    pub fn of(result: &WorkerResult<UploadResult>) -> Self {
        match result {
            Ok(_) => Disposition::Settle,
            Err(WorkerError::Cancelled) => Disposition::Release,
            Err(e) if e.is_retryable() => Disposition::Retry,
            Err(e) if e.outcome() == Outcome::UserFailure => Disposition::Settle,
            Err(_) => Disposition::DeadLetter,
        }
    }
}

/// Job executor that processes reversal jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, queue: Arc<JobQueue>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Shutdown flag, for components that must stop waiting when the worker stops.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Consume jobs until shutdown, then drain in-flight work.
    pub async fn run(&self, pipeline: Arc<Pipeline>) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = tokio::spawn(Self::claim_loop(
            Arc::clone(&self.queue),
            Arc::clone(&pipeline),
            Arc::clone(&self.job_semaphore),
            self.consumer_name.clone(),
            self.config.clone(),
            self.shutdown.subscribe(),
        ));

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs(&pipeline) => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!("In-flight jobs still running after {:?}", self.config.shutdown_timeout);
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Periodically take over jobs a crashed worker left pending.
    async fn claim_loop(
        queue: Arc<JobQueue>,
        pipeline: Arc<Pipeline>,
        semaphore: Arc<Semaphore>,
        consumer_name: String,
        config: WorkerConfig,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(config.claim_interval);
        let min_idle_ms = u64::try_from(config.claim_min_idle.as_millis()).unwrap_or(u64::MAX);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let jobs = match queue.claim_pending(&consumer_name, min_idle_ms, 5).await {
                        Ok(jobs) => jobs,
                        Err(e) => {
                            warn!("Failed to claim pending jobs: {}", e);
                            continue;
                        }
                    };
                    if !jobs.is_empty() {
                        info!("Claimed {} pending jobs", jobs.len());
                    }
                    for (message_id, job) in jobs {
                        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                            break;
                        };
                        let pipeline = Arc::clone(&pipeline);
                        let queue = Arc::clone(&queue);
                        let timeout = config.job_timeout;
                        tokio::spawn(async move {
                            let _permit = permit;
                            Self::execute_job(pipeline, queue, message_id, job, timeout).await;
                        });
                    }
                }
            }
        }
    }

    /// Consume and start jobs up to the free concurrency slots.
    async fn consume_jobs(&self, pipeline: &Arc<Pipeline>) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let permit = Arc::clone(&self.job_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::config_error("Job semaphore closed"))?;
            let pipeline = Arc::clone(pipeline);
            let queue = Arc::clone(&self.queue);
            let timeout = self.config.job_timeout;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(pipeline, queue, message_id, job, timeout).await;
            });
        }

        Ok(())
    }

    /// Run one job under the job timeout, then settle, retry or dead-letter it.
    async fn execute_job(
        pipeline: Arc<Pipeline>,
        queue: Arc<JobQueue>,
        message_id: String,
        job: ReverseJob,
        timeout: Duration,
    ) {
        let logger = JobLogger::new(&job.job_id, "reverse");
        let span = logger.create_span();

        async move {
            logger.log_start(&job.request.source.to_string());

            // Dropping the pipeline future on timeout means nothing is stored.
            let result = match tokio::time::timeout(timeout, pipeline.run(&job.request)).await {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Timeout(timeout.as_secs())),
            };

            match Disposition::of(&result) {
                Disposition::Settle => {
                    match &result {
                        Ok(published) => logger.log_completion(&published.url),
                        Err(e) => logger.log_warning(&format!("not reversible: {}", e)),
                    }
                    Self::settle(&queue, &message_id, &job).await;
                }
                Disposition::Release => {
                    logger.log_warning("cancelled by shutdown, leaving pending");
                }
                Disposition::Retry => {
                    let reason = failure_reason(&result);
                    logger.log_error(&reason);
                    Self::retry_or_dead_letter(&queue, &message_id, &job, &reason).await;
                }
                Disposition::DeadLetter => {
                    let reason = failure_reason(&result);
                    logger.log_error(&reason);
                    Self::dead_letter(&queue, &message_id, &job, &reason).await;
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn settle(queue: &JobQueue, message_id: &str, job: &ReverseJob) {
        if let Err(e) = queue.ack(message_id).await {
            error!("Failed to ack job {}: {}", job.job_id, e);
        }
        // Clear the queue dedup key so the same source can be requested again.
        if let Err(e) = queue.clear_dedup(job).await {
            warn!("Failed to clear dedup key for job {}: {}", job.job_id, e);
        }
    }

    async fn retry_or_dead_letter(queue: &JobQueue, message_id: &str, job: &ReverseJob, reason: &str) {
        let retry_count = match queue.increment_retry(message_id).await {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to count retry for job {}: {}", job.job_id, e);
                return;
            }
        };
        let max_retries = queue.max_retries();

        if retry_count >= max_retries {
            warn!("Job {} exceeded max retries ({}), moving to DLQ", job.job_id, max_retries);
            Self::dead_letter(queue, message_id, job, reason).await;
        } else {
            info!("Job {} will be retried (attempt {}/{})", job.job_id, retry_count, max_retries);
        }
    }

    async fn dead_letter(queue: &JobQueue, message_id: &str, job: &ReverseJob, reason: &str) {
        if let Err(e) = queue.dlq(message_id, job, reason).await {
            error!("Failed to move job {} to DLQ: {}", job.job_id, e);
        }
        if let Err(e) = queue.clear_dedup(job).await {
            warn!("Failed to clear dedup key for job {}: {}", job.job_id, e);
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        while self.job_semaphore.available_permits() < self.config.max_concurrent_jobs {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

fn failure_reason(result: &WorkerResult<UploadResult>) -> String {
    match result {
        Ok(_) => String::new(),
        Err(e) => e.to_string(),
    }
}
