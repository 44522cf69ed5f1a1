//! HTTP client implementation.

use http::Method;
use http::header::LOCATION;
use std::sync::Arc;
use tracing::debug;

use crate::{
    HttpClientConfig, HttpClientError, Request, RequestBuilder, Response, Result, Transport,
    default_transport,
};

/// HTTP client that sends every request through a single [`Transport`].
///
/// Everything in [`HttpClientConfig`] is applied here, above the transport, so
/// a decorator installed with [`HttpClient::with_transport`] sees the same
/// requests the default transport would, one round trip per redirect hop.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    config: Arc<HttpClientConfig>,
}

impl HttpClient {
    /// Create a client on the shared [`default_transport`].
    ///
    /// Use [`HttpClient::with_transport`] with a
    /// [`ReqwestTransport`](crate::ReqwestTransport) built from its builder for
    /// custom connection settings.
    pub fn new(config: HttpClientConfig) -> Self {
        Self::with_transport(config, default_transport())
    }

    /// Create a client that sends requests through `transport`.
    pub fn with_transport(config: HttpClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Self {
        Self::new(HttpClientConfig::default())
    }

    /// Get the installed transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Get the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Create a GET request builder.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::GET, url.into())
    }

    /// Create a POST request builder.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::POST, url.into())
    }

    /// Create a PUT request builder.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::PUT, url.into())
    }

    /// Create a PATCH request builder.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::PATCH, url.into())
    }

    /// Create a DELETE request builder.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::DELETE, url.into())
    }

    /// Create a HEAD request builder.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::HEAD, url.into())
    }

    /// Create a request builder with a custom method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, url.into())
    }

    /// Send an already built request through the transport, following
    /// redirects as configured.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let limit = self.config.redirects.limit();
        let mut request = request;
        let mut followed = 0;

        loop {
            let previous = limit.is_some().then(|| request.clone());

            debug!(method = %request.method(), url = %request.url(), "Sending HTTP request");
            let response = self.transport.round_trip(request).await?;
            debug!(status = %response.status(), "Received HTTP response");

            let (Some(limit), Some(previous)) = (limit, previous) else {
                return Ok(response);
            };
            let Some(location) = redirect_location(&previous, &response)? else {
                return Ok(response);
            };
            if followed == limit {
                return Err(HttpClientError::TooManyRedirects(limit));
            }

            followed += 1;
            debug!(location = %location, followed, "Following redirect");
            request = previous.redirected(response.status(), location);
        }
    }
}

/// Where a followable redirect points, resolved against the request URL.
fn redirect_location(request: &Request, response: &Response) -> Result<Option<url::Url>> {
    let followable = matches!(response.status().as_u16(), 301 | 302 | 303 | 307 | 308);
    let location = match response.header(LOCATION) {
        Some(location) if followable && !location.is_empty() => location,
        _ => return Ok(None),
    };

    request
        .url()
        .join(location)
        .map(Some)
        .map_err(|e| HttpClientError::InvalidUrl(format!("bad Location {location:?}: {e}")))
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::default_client()
    }
}
