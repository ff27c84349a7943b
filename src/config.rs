use std::time::Duration;

/// Default request timeout. No endpoint streams, so a stuck request should
/// fail rather than hold the surface's turn slot open indefinitely.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the document-chat backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://app.example.com` (no trailing slash).
    pub base_url: String,
    /// Bearer token attached to every request when present. Obtaining the
    /// token is the host application's job.
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `DOCBOX_API_URL` and `DOCBOX_API_TOKEN` from the environment.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("DOCBOX_API_URL").ok()?;
        let mut config = Self::new(base_url);
        if let Ok(token) = std::env::var("DOCBOX_API_TOKEN") {
            if !token.is_empty() {
                config = config.with_token(token);
            }
        }
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ApiConfig::new("https://example.com/");
        assert_eq!(config.base_url, "https://example.com");
    }

    #[test]
    fn defaults() {
        let config = ApiConfig::new("http://localhost:3000");
        assert!(config.auth_token.is_none());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn builder_sets_token_and_timeout() {
        let config = ApiConfig::new("http://localhost:3000")
            .with_token("abc")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.auth_token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
