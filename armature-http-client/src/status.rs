//! Typed client for an `httpstat.us` style status service.
//!
//! The service answers `GET /{code}` with the requested status and a JSON body
//! describing it. It is mostly useful for exercising transports against real
//! status codes and latencies.

use crate::{HttpClient, HttpClientError, Response};
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default base URL of the status service.
pub const DEFAULT_BASE_URL: &str = "https://httpstat.us";

/// Status description returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpStatus {
    /// Status code.
    pub code: u16,
    /// Reason phrase.
    pub description: String,
}

/// Raw response of an API call, kept next to the decoded value.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    response: Response,
}

impl ApiResponse {
    /// Get the HTTP response.
    pub fn http_response(&self) -> &Response {
        &self.response
    }

    /// Get the raw body.
    pub fn body(&self) -> &[u8] {
        self.response.bytes()
    }
}

/// Errors returned by [`StatusService`].
#[derive(Debug, Error)]
pub enum StatusError {
    /// The request never produced a response.
    #[error(transparent)]
    Client(#[from] HttpClientError),

    /// The service answered with a non-2xx status.
    #[error("{}: {}, Body: {}", .response.http_response().status().as_u16(), reason(.response), String::from_utf8_lossy(.response.body()))]
    Api {
        /// Response as received.
        response: ApiResponse,
    },

    /// The body could not be decoded.
    #[error("cannot decode status body: {source}")]
    Decode {
        /// Response as received.
        response: ApiResponse,
        /// Decoder error.
        source: serde_json::Error,
    },
}

impl StatusError {
    /// Get the response attached to this error, if one was received.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Self::Client(_) => None,
            Self::Api { response } | Self::Decode { response, .. } => Some(response),
        }
    }
}

fn reason(response: &ApiResponse) -> &'static str {
    response
        .http_response()
        .status()
        .canonical_reason()
        .unwrap_or("Unknown")
}

/// Status client configuration.
#[derive(Clone)]
pub struct StatusClientConfig {
    http_client: HttpClient,
    delay: u64,
    base_url: String,
}

impl Default for StatusClientConfig {
    fn default() -> Self {
        Self {
            http_client: HttpClient::default(),
            delay: 0,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl StatusClientConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP client used for API requests. `None` keeps the current one.
    pub fn with_http_client(mut self, http_client: Option<HttpClient>) -> Self {
        if let Some(http_client) = http_client {
            self.http_client = http_client;
        }
        self
    }

    /// Set the base URL. Empty values are ignored; trailing slashes are dropped.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        let base_url = base_url.as_ref();
        if !base_url.is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    /// Set the server-side delay in milliseconds. Only values above zero are used.
    pub fn with_delay(mut self, delay: u64) -> Self {
        if delay > 0 {
            self.delay = delay;
        }
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the delay in milliseconds.
    pub fn delay(&self) -> u64 {
        self.delay
    }
}

/// Client for the status service.
#[derive(Clone)]
pub struct StatusClient {
    config: StatusClientConfig,
}

impl StatusClient {
    /// Create a client.
    pub fn new(config: StatusClientConfig) -> Self {
        Self { config }
    }

    /// Access the status endpoints.
    pub fn status(&self) -> StatusService<'_> {
        StatusService { client: self }
    }

    /// Get the configuration.
    pub fn config(&self) -> &StatusClientConfig {
        &self.config
    }
}

impl Default for StatusClient {
    fn default() -> Self {
        Self::new(StatusClientConfig::default())
    }
}

/// Endpoints under `/`.
pub struct StatusService<'a> {
    client: &'a StatusClient,
}

impl StatusService<'_> {
    /// Request the `200 OK` status.
    pub async fn ok(
        &self,
        cancellation: Option<CancellationToken>,
    ) -> Result<(HttpStatus, ApiResponse), StatusError> {
        self.fetch(200, cancellation).await
    }

    async fn fetch(
        &self,
        code: u16,
        cancellation: Option<CancellationToken>,
    ) -> Result<(HttpStatus, ApiResponse), StatusError> {
        let config = &self.client.config;
        let mut request = config
            .http_client
            .get(format!("{}/{}", config.base_url, code))
            .header("Accept", "application/json");

        if config.delay > 0 {
            request = request.query("sleep", config.delay.to_string());
        }
        if let Some(token) = cancellation {
            request = request.cancellation(token);
        }

        let response = ApiResponse {
            response: request.send().await?,
        };

        if !response.http_response().is_success() {
            return Err(StatusError::Api { response });
        }

        match serde_json::from_slice::<HttpStatus>(response.body()) {
            Ok(status) => Ok((status, response)),
            Err(source) => {
                tracing::warn!(error = %source, "Status body is not valid JSON");
                Err(StatusError::Decode { response, source })
            }
        }
    }
}
