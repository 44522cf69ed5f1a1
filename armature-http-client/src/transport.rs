//! Transports: the single round-trip capability every client call goes through.

use crate::{HttpClientError, Request, Response, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Executes one HTTP round trip.
///
/// Implementations may block on network I/O for as long as the request's
/// timeout allows. A transport never retries on its own; decorators that wrap
/// another transport must hand the request through unmodified.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a single HTTP transaction, returning the response for `request`.
    async fn round_trip(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn round_trip(&self, request: Request) -> Result<Response> {
        (**self).round_trip(request).await
    }
}

static DEFAULT_TRANSPORT: Lazy<Arc<dyn Transport>> =
    Lazy::new(|| match ReqwestTransport::builder().build() {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            warn!(error = %e, "Default HTTP transport unavailable");
            Arc::new(Unavailable {
                reason: e.to_string(),
            })
        }
    });

/// The process-wide default transport.
///
/// It is shared by every caller and does not follow redirects, so each call is
/// exactly one round trip.
pub fn default_transport() -> Arc<dyn Transport> {
    Arc::clone(&DEFAULT_TRANSPORT)
}

/// Stands in for a default transport whose client could not be built.
struct Unavailable {
    reason: String,
}

#[async_trait]
impl Transport for Unavailable {
    async fn round_trip(&self, _request: Request) -> Result<Response> {
        Err(HttpClientError::Connection(format!(
            "default transport unavailable: {}",
            self.reason
        )))
    }
}

/// Transport backed by a [`reqwest::Client`].
///
/// Redirects are never followed here; [`HttpClient`](crate::HttpClient) follows
/// them one round trip at a time.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Start configuring a transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Wrap an existing reqwest client as-is.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    async fn send(&self, request: reqwest::Request) -> Result<Response> {
        let response = self.client.execute(request).await?;
        trace!(status = %response.status(), "Received HTTP response");
        Response::from_reqwest(response).await
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(&self, request: Request) -> Result<Response> {
        trace!(method = %request.method(), url = %request.url(), "Sending HTTP request");

        let outbound = request.to_reqwest();
        match request.cancellation() {
            Some(token) if token.is_cancelled() => {
                debug!(url = %request.url(), "Request cancelled before sending");
                Err(HttpClientError::Canceled)
            }
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(url = %request.url(), "Request cancelled in flight");
                        Err(HttpClientError::Canceled)
                    }
                    result = self.send(outbound) => result,
                }
            }
            None => self.send(outbound).await,
        }
    }
}

/// Connection-level settings for a [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    pool_idle_timeout: Duration,
    pool_max_idle_per_host: usize,
    gzip: bool,
    brotli: bool,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            gzip: true,
            brotli: true,
        }
    }
}

impl ReqwestTransportBuilder {
    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long idle pooled connections are kept.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set the maximum idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable transparent gzip decoding.
    pub fn gzip(mut self, enable: bool) -> Self {
        self.gzip = enable;
        self
    }

    /// Enable or disable transparent brotli decoding.
    pub fn brotli(mut self, enable: bool) -> Self {
        self.brotli = enable;
        self
    }

    /// Build the transport. Fails when reqwest cannot build the client.
    pub fn build(self) -> Result<ReqwestTransport> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .gzip(self.gzip)
            .brotli(self.brotli)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        debug!(
            connect_timeout = ?self.connect_timeout,
            gzip = self.gzip,
            brotli = self.brotli,
            "Built reqwest transport"
        );
        Ok(ReqwestTransport::from_client(client))
    }
}
