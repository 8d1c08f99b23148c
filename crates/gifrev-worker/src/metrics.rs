//! Pipeline metrics.

use std::net::SocketAddr;
use std::time::Duration;

use gifrev_models::HostKind;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Metric name constants for consistency.
pub mod names {
    /// Upload attempts by host and attempt outcome.
    pub const UPLOAD_ATTEMPTS_TOTAL: &str = "gifrev_upload_attempts_total";

    /// Dedup lookups by result (hit, miss, error).
    pub const DEDUP_LOOKUPS_TOTAL: &str = "gifrev_dedup_lookups_total";

    /// Finished requests by outcome.
    pub const REQUESTS_TOTAL: &str = "gifrev_requests_total";

    /// Ticket status checks by host.
    pub const POLL_CHECKS_TOTAL: &str = "gifrev_poll_checks_total";

    /// End-to-end request duration.
    pub const REQUEST_DURATION_SECONDS: &str = "gifrev_request_duration_seconds";
}

/// Serve Prometheus metrics on `addr`.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(())
}

pub fn record_upload_attempt(host: HostKind, outcome: &'static str) {
    counter!(
        names::UPLOAD_ATTEMPTS_TOTAL,
        "host" => host.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_dedup_lookup(result: &'static str) {
    counter!(names::DEDUP_LOOKUPS_TOTAL, "result" => result).increment(1);
}

pub fn record_poll_check(host: HostKind) {
    counter!(names::POLL_CHECKS_TOTAL, "host" => host.as_str()).increment(1);
}

pub fn record_request(outcome: &'static str, duration: Duration) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "outcome" => outcome).record(duration.as_secs_f64());
}
