//! Host configuration.
//!
//! Every backend reads its base URLs and credentials from the environment.
//! Base URLs are overridable so the adapters can be pointed at mock servers.

use std::time::Duration;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Shared HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Cap on a single source download
    pub max_download_bytes: u64,
    /// User agent sent to every host
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            max_download_bytes: 1_000_000_000,
            user_agent: concat!("gifrev/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: std::env::var("HOST_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_timeout: std::env::var("HOST_HTTP_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            max_download_bytes: std::env::var("HOST_MAX_DOWNLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_download_bytes),
            user_agent: env_or("HOST_USER_AGENT", &defaults.user_agent),
        }
    }
}

/// Image/video CDN with a fast but capacity-limited encoder.
#[derive(Debug, Clone)]
pub struct ImageHostConfig {
    /// Metadata API root
    pub api_base: String,
    /// Upload and poll endpoints root (also the public page root)
    pub upload_base: String,
    /// Direct media root
    pub media_base: String,
    /// Where removed uploads redirect to
    pub removed_url: String,
    pub client_id: Option<String>,
    pub cookie: Option<String>,
}

impl Default for ImageHostConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.imgur.com/3".to_string(),
            upload_base: "https://imgur.com".to_string(),
            media_base: "https://i.imgur.com".to_string(),
            removed_url: "https://i.imgur.com/removed.png".to_string(),
            client_id: None,
            cookie: None,
        }
    }
}

impl ImageHostConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: trim_base(env_or("IMAGE_HOST_API_BASE", &d.api_base)),
            upload_base: trim_base(env_or("IMAGE_HOST_UPLOAD_BASE", &d.upload_base)),
            media_base: trim_base(env_or("IMAGE_HOST_MEDIA_BASE", &d.media_base)),
            removed_url: env_or("IMAGE_HOST_REMOVED_URL", &d.removed_url),
            client_id: env_opt("IMAGE_HOST_CLIENT_ID"),
            cookie: env_opt("IMAGE_HOST_COOKIE"),
        }
    }
}

/// Higher-capacity video CDN.
#[derive(Debug, Clone)]
pub struct VideoHostConfig {
    pub api_base: String,
    /// File drop root that receives the raw bytes
    pub upload_base: String,
    /// Public page root
    pub page_base: String,
    pub access_token: Option<String>,
}

impl Default for VideoHostConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.gfycat.com/v1".to_string(),
            upload_base: "https://filedrop.gfycat.com".to_string(),
            page_base: "https://gfycat.com".to_string(),
            access_token: None,
        }
    }
}

impl VideoHostConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: trim_base(env_or("VIDEO_HOST_API_BASE", &d.api_base)),
            upload_base: trim_base(env_or("VIDEO_HOST_UPLOAD_BASE", &d.upload_base)),
            page_base: trim_base(env_or("VIDEO_HOST_PAGE_BASE", &d.page_base)),
            access_token: env_opt("VIDEO_HOST_ACCESS_TOKEN"),
        }
    }
}

/// Link-only video CDN.
#[derive(Debug, Clone)]
pub struct LinkHostConfig {
    pub api_base: String,
    pub page_base: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for LinkHostConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.streamable.com".to_string(),
            page_base: "https://streamable.com".to_string(),
            username: None,
            password: None,
        }
    }
}

impl LinkHostConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: trim_base(env_or("LINK_HOST_API_BASE", &d.api_base)),
            page_base: trim_base(env_or("LINK_HOST_PAGE_BASE", &d.page_base)),
            username: env_opt("LINK_HOST_USERNAME"),
            password: env_opt("LINK_HOST_PASSWORD"),
        }
    }
}

/// Submission host whose posts embed media.
#[derive(Debug, Clone)]
pub struct EmbeddedHostConfig {
    pub api_base: String,
}

impl Default for EmbeddedHostConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.reddit.com".to_string(),
        }
    }
}

impl EmbeddedHostConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: trim_base(env_or("EMBEDDED_HOST_API_BASE", &Self::default().api_base)),
        }
    }
}

/// Configuration for every backend.
#[derive(Debug, Clone, Default)]
pub struct HostsConfig {
    pub http: HttpConfig,
    pub image: ImageHostConfig,
    pub video: VideoHostConfig,
    pub link: LinkHostConfig,
    pub embedded: EmbeddedHostConfig,
}

impl HostsConfig {
    pub fn from_env() -> Self {
        Self {
            http: HttpConfig::from_env(),
            image: ImageHostConfig::from_env(),
            video: VideoHostConfig::from_env(),
            link: LinkHostConfig::from_env(),
            embedded: EmbeddedHostConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_public_hosts() {
        let config = HostsConfig::default();
        assert_eq!(config.image.removed_url, "https://i.imgur.com/removed.png");
        assert!(config.video.access_token.is_none());
        assert_eq!(config.http.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_trim_base_drops_trailing_slash() {
        assert_eq!(trim_base("http://localhost:1234/".to_string()), "http://localhost:1234");
    }
}
