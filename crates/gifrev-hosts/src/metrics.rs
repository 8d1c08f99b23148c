//! Host request metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total host requests by host, operation and status.
    pub const REQUESTS_TOTAL: &str = "gifrev_host_requests_total";

    /// Request latency in seconds by host and operation.
    pub const LATENCY_SECONDS: &str = "gifrev_host_latency_seconds";

    /// Bytes downloaded from source hosts.
    pub const DOWNLOADED_BYTES: &str = "gifrev_host_downloaded_bytes_total";
}

/// Record metrics for a completed host request.
pub fn record_request(host: &str, operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "host" => host.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "host" => host.to_string(),
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a finished source download.
pub fn record_download(host: &str, bytes: u64) {
    counter!(names::DOWNLOADED_BYTES, "host" => host.to_string()).increment(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.starts_with("gifrev_"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
    }
}
