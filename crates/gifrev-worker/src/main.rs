//! Reversal worker binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gifrev_hosts::{HostRegistry, HostsConfig};
use gifrev_media::{FfmpegReverser, FfprobeProbe};
use gifrev_queue::JobQueue;
use gifrev_storage::DedupConfig;
use gifrev_worker::{metrics, DedupCache, JobExecutor, Pipeline, UploadOrchestrator, UploadPolicy, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("gifrev=info".parse().expect("valid directive"))
        .add_directive("hyper=warn".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting gifrev-worker");

    if let Some(port) = std::env::var("METRICS_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match metrics::install_exporter(addr) {
            Ok(()) => info!("Serving metrics on {}", addr),
            Err(e) => error!("Failed to install metrics exporter: {}", e),
        }
    }

    let config = WorkerConfig::from_env();
    let policy = UploadPolicy::from_env();
    info!("Worker config: {:?}, upload policy: {:?}", config, policy);

    let hosts = match HostRegistry::from_config(&HostsConfig::from_env()) {
        Ok(hosts) => hosts,
        Err(e) => {
            error!("Failed to configure hosts: {}", e);
            std::process::exit(1);
        }
    };

    let store = match DedupConfig::from_env().and_then(gifrev_storage::open) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open dedup store: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match JobQueue::from_env() {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let executor = Arc::new(JobExecutor::new(config.clone(), queue));

    let reverser = FfmpegReverser::new()
        .with_timeout(config.reversal_timeout)
        .with_cancel(executor.subscribe());
    let pipeline = Pipeline::new(
        hosts,
        Arc::new(FfprobeProbe::new()),
        Arc::new(reverser),
        DedupCache::new(store),
    )
    .with_orchestrator(UploadOrchestrator::new(policy).with_cancel(executor.subscribe()));
    info!("Pipeline ready: {:?}", pipeline);

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    if let Err(e) = executor.run(Arc::new(pipeline)).await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
