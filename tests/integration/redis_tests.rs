//! Redis integration tests for the dedup store and the job queue.

use std::sync::Arc;
use std::time::Duration;

use gifrev_models::{HostKind, ReverseRequest, SourceDescriptor, UploadResult};
use gifrev_queue::{JobQueue, QueueConfig, QueueError, ReverseJob};
use gifrev_storage::{DedupBackend, DedupConfig, DedupStore};
use gifrev_worker::DedupCache;
use uuid::Uuid;

fn redis_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// A queue on streams no other test touches.
async fn fresh_queue() -> JobQueue {
    let run = Uuid::new_v4();
    let config = QueueConfig {
        redis_url: redis_url(),
        stream_name: format!("gifrev:test:{}:jobs", run),
        consumer_group: format!("gifrev:test:{}:workers", run),
        dlq_stream_name: format!("gifrev:test:{}:dlq", run),
        ..QueueConfig::default()
    };
    let queue = JobQueue::new(config).expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");
    queue
}

fn fresh_store() -> Arc<dyn DedupStore> {
    let config = DedupConfig {
        backend: DedupBackend::Redis,
        redis_url: redis_url(),
        key_prefix: format!("gifrev:test:{}", Uuid::new_v4()),
        ttl: Some(Duration::from_secs(60)),
    };
    gifrev_storage::open(config).expect("Failed to open store")
}

fn request(id: &str) -> ReverseRequest {
    ReverseRequest::new(SourceDescriptor::new(
        HostKind::EmbeddedHost,
        id,
        format!("https://e.example.com/{}", id),
    ))
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_dedup_round_trip_and_invalidate() {
    let cache = DedupCache::new(fresh_store());
    let source = request("round_trip").source;
    let result = UploadResult::new(HostKind::ImageHost, "abc", "https://i.example.com/abc.mp4");

    assert!(cache.lookup(&source).await.unwrap().is_none());
    cache.store(&source, &result).await.unwrap();

    let first = cache.lookup(&source).await.unwrap().unwrap();
    let second = cache.lookup(&source).await.unwrap().unwrap();
    assert_eq!(first.result, result);
    assert_eq!(first, second);

    assert!(cache.invalidate(&source).await.unwrap());
    assert!(cache.lookup(&source).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_enqueue_consume_ack() {
    let queue = fresh_queue().await;
    let job = ReverseJob::new(request("consume"));

    queue.enqueue(&job).await.expect("Failed to enqueue");
    assert_eq!(queue.len().await.unwrap(), 1);

    let jobs = queue.consume("test-consumer", 1000, 1).await.expect("Failed to consume");
    assert_eq!(jobs.len(), 1);
    let (message_id, consumed) = &jobs[0];
    assert_eq!(consumed, &job);

    queue.ack(message_id).await.expect("Failed to ack");
    queue.clear_dedup(&job).await.expect("Failed to clear dedup key");
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_identical_request_is_queued_once() {
    let queue = fresh_queue().await;
    let source_id = format!("dup_{}", Uuid::new_v4());

    queue.enqueue(&ReverseJob::new(request(&source_id))).await.unwrap();
    let second = queue.enqueue(&ReverseJob::new(request(&source_id))).await;
    assert!(matches!(second, Err(QueueError::Duplicate(_))));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_retry_count_and_dlq() {
    let queue = fresh_queue().await;
    let job = ReverseJob::new(request(&format!("dlq_{}", Uuid::new_v4())));
    queue.enqueue(&job).await.unwrap();

    let jobs = queue.consume("test-dlq-consumer", 1000, 1).await.unwrap();
    let (message_id, _) = &jobs[0];

    assert_eq!(queue.increment_retry(message_id).await.unwrap(), 1);
    assert_eq!(queue.increment_retry(message_id).await.unwrap(), 2);
    assert_eq!(queue.get_retry_count(message_id).await.unwrap(), 2);

    queue.dlq(message_id, &job, "upload exhausted").await.unwrap();
    assert_eq!(queue.dlq_len().await.unwrap(), 1);
    assert_eq!(queue.get_retry_count(message_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_idle_pending_job_is_claimed() {
    let queue = fresh_queue().await;
    let job = ReverseJob::new(request(&format!("claim_{}", Uuid::new_v4())));
    queue.enqueue(&job).await.unwrap();

    let consumed = queue.consume("crashed-worker", 1000, 1).await.unwrap();
    assert_eq!(consumed.len(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let claimed = queue.claim_pending("rescuer", 10, 5).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].1, job);
}
