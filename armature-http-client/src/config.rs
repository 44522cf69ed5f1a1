//! Client-level settings.
//!
//! Everything here is applied by [`HttpClient`](crate::HttpClient) itself, above
//! the transport, so it holds for whichever [`Transport`](crate::Transport) is
//! installed. Connection-level knobs live on
//! [`ReqwestTransportBuilder`](crate::ReqwestTransportBuilder).

use std::time::Duration;

/// Redirects followed by default.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// How the client reacts to a 3xx response carrying a `Location` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Hand the 3xx response back to the caller.
    None,
    /// Follow up to this many redirects, then fail with
    /// [`HttpClientError::TooManyRedirects`](crate::HttpClientError::TooManyRedirects).
    Limited(usize),
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::Limited(DEFAULT_MAX_REDIRECTS)
    }
}

impl RedirectPolicy {
    /// Maximum number of hops to follow, `None` when redirects are returned as-is.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Limited(max) => Some(*max),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL relative request paths are joined onto.
    pub base_url: Option<String>,
    /// Timeout for requests that set none of their own.
    pub timeout: Duration,
    /// Headers added to every request unless the request sets them.
    pub default_headers: Vec<(String, String)>,
    /// Sent as `User-Agent` unless the request sets one.
    pub user_agent: String,
    /// Redirect handling.
    pub redirects: RedirectPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            default_headers: Vec::new(),
            user_agent: format!("armature-http-client/{}", env!("CARGO_PKG_VERSION")),
            redirects: RedirectPolicy::default(),
        }
    }
}

impl HttpClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`].
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Add a default header.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Turn redirect following on (with the default limit, unless a limit was
    /// already set) or off.
    pub fn follow_redirects(mut self, enable: bool) -> Self {
        self.config.redirects = match (enable, self.config.redirects) {
            (false, _) => RedirectPolicy::None,
            (true, RedirectPolicy::None) => RedirectPolicy::default(),
            (true, limited) => limited,
        };
        self
    }

    /// Follow at most `max` redirects.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.redirects = RedirectPolicy::Limited(max);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.base_url.is_none());
        assert_eq!(config.redirects, RedirectPolicy::Limited(DEFAULT_MAX_REDIRECTS));
        assert!(config.user_agent.starts_with("armature-http-client/"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = HttpClientConfig::builder()
            .base_url("https://httpstat.us")
            .timeout(Duration::from_millis(10))
            .user_agent("status-checker/1")
            .default_header("accept", "application/json")
            .build();

        assert_eq!(config.base_url.as_deref(), Some("https://httpstat.us"));
        assert_eq!(config.timeout, Duration::from_millis(10));
        assert_eq!(config.user_agent, "status-checker/1");
        assert_eq!(
            config.default_headers,
            vec![("accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn test_redirect_options_apply_in_order() {
        let off = HttpClientConfig::builder().follow_redirects(false).build();
        assert_eq!(off.redirects, RedirectPolicy::None);
        assert_eq!(off.redirects.limit(), None);

        let limited = HttpClientConfig::builder()
            .max_redirects(3)
            .follow_redirects(true)
            .build();
        assert_eq!(limited.redirects.limit(), Some(3));

        let back_on = HttpClientConfig::builder()
            .follow_redirects(false)
            .follow_redirects(true)
            .build();
        assert_eq!(back_on.redirects, RedirectPolicy::default());

        let disabled_last = HttpClientConfig::builder()
            .max_redirects(3)
            .follow_redirects(false)
            .build();
        assert_eq!(disabled_last.redirects, RedirectPolicy::None);
    }
}
