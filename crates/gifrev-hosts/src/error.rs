//! Host adapter error types.

use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors that can occur while talking to a media host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Media not found: {0}")]
    NotFound(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Host over capacity: {0}")]
    OverCapacity(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error {0}: {1}")]
    ServerError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Download too large: {0} bytes")]
    TooLarge(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Marker some hosts put in a response body instead of a proper status code.
const OVER_CAPACITY_MARKER: &str = "over capacity";

impl HostError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify a non-success HTTP response.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status == 503 || mentions_over_capacity(&body) {
            return Self::OverCapacity(body);
        }
        match status {
            404 | 410 => Self::NotFound(body),
            429 => Self::RateLimited(body),
            500..=599 => Self::ServerError(status, body),
            _ => Self::Rejected(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Worth another attempt on the same host.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HostError::Network(_)
                | HostError::RateLimited(_)
                | HostError::ServerError(_, _)
                | HostError::OverCapacity(_)
                | HostError::InvalidResponse(_)
                | HostError::Json(_)
        )
    }

    /// The host asked for a longer back-off.
    pub fn is_over_capacity(&self) -> bool {
        matches!(self, HostError::OverCapacity(_))
    }

    /// HTTP status to report in metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            HostError::NotFound(_) => Some(404),
            HostError::RateLimited(_) => Some(429),
            HostError::OverCapacity(_) => Some(503),
            HostError::ServerError(status, _) => Some(*status),
            HostError::Rejected(_) => Some(400),
            HostError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// True if a response body carries the capacity marker.
pub fn mentions_over_capacity(body: &str) -> bool {
    body.to_ascii_lowercase().contains(OVER_CAPACITY_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_rate_limited() {
        let err = HostError::from_http_status(429, "slow down");
        assert!(matches!(err, HostError::RateLimited(_)));
        assert!(err.is_retryable());
        assert!(!err.is_over_capacity());
    }

    #[test]
    fn test_from_http_status_server_error() {
        let err = HostError::from_http_status(502, "bad gateway");
        assert!(matches!(err, HostError::ServerError(502, _)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_http_status_over_capacity() {
        assert!(HostError::from_http_status(503, "").is_over_capacity());
        assert!(HostError::from_http_status(400, "Imgur is over capacity!").is_over_capacity());
    }

    #[test]
    fn test_from_http_status_rejected_is_final() {
        let err = HostError::from_http_status(400, "file type invalid");
        assert!(matches!(err, HostError::Rejected(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_http_status_not_found() {
        let err = HostError::from_http_status(404, "gone");
        assert!(matches!(err, HostError::NotFound(_)));
        assert_eq!(err.http_status(), Some(404));
    }
}
