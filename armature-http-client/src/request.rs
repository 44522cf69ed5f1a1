//! Outbound requests and the request builder.

use crate::{HttpClient, HttpClientError, Response, Result};
use bytes::Bytes;
use http::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, USER_AGENT, WWW_AUTHENTICATE,
};
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A single outbound HTTP request as seen by a [`Transport`](crate::Transport).
///
/// Besides the wire-level parts, a request carries the caller's cancellation
/// token and a typed extension map. Decorators read their per-request context
/// (for example an `opentelemetry::Context`) out of the extensions.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
    extensions: Extensions,
}

impl Request {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            cancellation: None,
            extensions: Extensions::new(),
        }
    }

    /// Get the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the request body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Get the per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the cancellation token attached to this request.
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Get the typed extensions of this request.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Get mutable access to the typed extensions.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Set a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Insert a typed extension.
    pub fn with_extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// The request to send after `status` pointed at `location`.
    ///
    /// 307 and 308 replay the method and body. 301 and 302 turn a POST into a
    /// GET, 303 turns anything but HEAD into a GET, and all three drop the body.
    /// Credentials are not forwarded to another host.
    pub(crate) fn redirected(mut self, status: StatusCode, location: Url) -> Self {
        let replay = matches!(
            status,
            StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
        );

        if !replay {
            let to_get = match status {
                StatusCode::SEE_OTHER => self.method != Method::HEAD,
                _ => self.method == Method::POST,
            };
            if to_get {
                self.method = Method::GET;
            }
            self.body = None;
            self.headers.remove(CONTENT_TYPE);
            self.headers.remove(CONTENT_LENGTH);
        }

        if location.host_str() != self.url.host_str() {
            self.headers.remove(AUTHORIZATION);
            self.headers.remove(WWW_AUTHENTICATE);
            self.headers.remove(COOKIE);
        }

        self.url = location;
        self
    }

    /// Convert into a reqwest request. Cancellation and extensions stay behind.
    pub(crate) fn to_reqwest(&self) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        if let Some(body) = &self.body {
            *request.body_mut() = Some(reqwest::Body::from(body.clone()));
        }
        *request.timeout_mut() = self.timeout;
        request
    }
}

/// HTTP request builder.
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
    extensions: Extensions,
}

impl<'a> RequestBuilder<'a> {
    /// Create a new request builder.
    pub(crate) fn new(client: &'a HttpClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            cancellation: None,
            extensions: Extensions::new(),
        }
    }

    /// Add a header to the request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add multiple headers to the request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add multiple query parameters.
    pub fn queries<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in params {
            self.query.push((k.into(), v.into()));
        }
        self
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request body as text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.body = Some(text.into_bytes());
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: Serialize>(mut self, json: &T) -> Self {
        match serde_json::to_vec(json) {
            Ok(bytes) => {
                self.headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                self.body = Some(bytes);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize JSON body");
            }
        }
        self
    }

    /// Set the request body as form data.
    pub fn form<T: Serialize>(mut self, form: &T) -> Self {
        match serde_urlencoded::to_string(form) {
            Ok(encoded) => {
                self.headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
                self.body = Some(encoded.into_bytes());
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode form data");
            }
        }
        self
    }

    /// Set a custom timeout for this request, overriding the client timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cancel the request when `token` fires.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Attach a typed extension that travels with the request to the transport.
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Set bearer authentication.
    pub fn bearer_auth(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Set basic authentication.
    pub fn basic_auth(
        self,
        username: impl Into<String>,
        password: Option<impl Into<String>>,
    ) -> Self {
        use base64::Engine;
        let credentials = match password {
            Some(p) => format!("{}:{}", username.into(), p.into()),
            None => format!("{}:", username.into()),
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header("Authorization", format!("Basic {}", encoded))
    }

    /// Build the URL with query parameters.
    fn build_url(&self) -> Result<Url> {
        let mut url = if let Some(base) = &self.client.config().base_url {
            let base = Url::parse(base).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?;
            base.join(&self.url)
                .map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?
        } else {
            Url::parse(&self.url).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?
        };

        if !self.query.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                query_pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Build the request without sending it.
    pub fn build(self) -> Result<Request> {
        let url = self.build_url()?;
        let client = self.client;
        let config = client.config();

        let mut request = Request::new(self.method, url);

        for (name, value) in &config.default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;
            request.headers.insert(name, value);
        }
        request.headers.extend(self.headers);

        if !request.headers.contains_key(USER_AGENT) {
            let agent = HeaderValue::try_from(config.user_agent.as_str())
                .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;
            request.headers.insert(USER_AGENT, agent);
        }

        if let Some(body) = self.body {
            request.body = Some(Bytes::from(body));
        }

        request.timeout = Some(self.timeout.unwrap_or(config.timeout));
        request.cancellation = self.cancellation;
        request.extensions = self.extensions;

        Ok(request)
    }

    /// Send the request through the client's transport.
    pub async fn send(self) -> Result<Response> {
        let client = self.client;
        let request = self.build()?;
        client.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpClientConfig;

    #[test]
    fn test_build_resolves_base_url_and_query() {
        let client = HttpClient::new(
            HttpClientConfig::builder()
                .base_url("https://httpstat.us")
                .build(),
        );

        let request = client
            .get("/200")
            .query("sleep", "100")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "https://httpstat.us/200?sleep=100");
    }

    #[test]
    fn test_build_applies_client_timeout_unless_overridden() {
        let client = HttpClient::new(
            HttpClientConfig::builder()
                .timeout(Duration::from_secs(5))
                .build(),
        );

        let default = client.get("http://localhost/a").build().unwrap();
        assert_eq!(default.timeout(), Some(Duration::from_secs(5)));

        let custom = client
            .get("http://localhost/a")
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        assert_eq!(custom.timeout(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_build_merges_default_headers() {
        let client = HttpClient::new(
            HttpClientConfig::builder()
                .default_header("x-service", "status")
                .build(),
        );

        let request = client
            .post("http://localhost/orders")
            .header("x-request", "1")
            .json(&serde_json::json!({"item": "widget"}))
            .build()
            .unwrap();

        assert_eq!(request.headers()["x-service"], "status");
        assert_eq!(request.headers()["x-request"], "1");
        assert_eq!(request.headers()[http::header::CONTENT_TYPE], "application/json");
        assert!(request.body().is_some());
    }

    #[test]
    fn test_build_rejects_invalid_url() {
        let client = HttpClient::default();
        let err = client.get("not a url").build().unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_extensions_and_cancellation_travel_with_request() {
        #[derive(Clone, Debug, PartialEq)]
        struct Tag(&'static str);

        let token = CancellationToken::new();
        let client = HttpClient::default();
        let request = client
            .get("http://localhost/")
            .extension(Tag("caller"))
            .cancellation(token.clone())
            .build()
            .unwrap();

        assert_eq!(request.extensions().get::<Tag>(), Some(&Tag("caller")));
        token.cancel();
        assert!(request.cancellation().unwrap().is_cancelled());
    }

    #[test]
    fn test_to_reqwest_keeps_wire_parts() {
        let url = Url::parse("http://localhost/echo").unwrap();
        let request = Request::new(Method::PUT, url)
            .with_header(http::header::ACCEPT, HeaderValue::from_static("text/plain"))
            .with_body("hello")
            .with_timeout(Duration::from_secs(1));

        let converted = request.to_reqwest();
        assert_eq!(converted.method(), Method::PUT);
        assert_eq!(converted.url().as_str(), "http://localhost/echo");
        assert_eq!(converted.headers()[http::header::ACCEPT], "text/plain");
        assert_eq!(converted.timeout(), Some(&Duration::from_secs(1)));
        assert!(converted.body().is_some());
    }

    #[test]
    fn test_build_sets_configured_user_agent() {
        let client = HttpClient::new(HttpClientConfig::builder().user_agent("status-checker/1").build());

        let request = client.get("http://localhost/").build().unwrap();
        assert_eq!(request.headers()[USER_AGENT], "status-checker/1");

        let own = client
            .get("http://localhost/")
            .header("user-agent", "caller/2")
            .build()
            .unwrap();
        assert_eq!(own.headers()[USER_AGENT], "caller/2");
    }

    #[test]
    fn test_build_rejects_invalid_user_agent() {
        let client = HttpClient::new(HttpClientConfig::builder().user_agent("bad\nagent").build());
        let err = client.get("http://localhost/").build().unwrap_err();
        assert!(matches!(err, HttpClientError::RequestBuild(_)));
    }

    #[test]
    fn test_text_and_form_bodies() {
        let client = HttpClient::default();

        let text = client.post("http://localhost/").text("hello").build().unwrap();
        assert_eq!(text.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(text.body().map(|b| b.as_ref()), Some(&b"hello"[..]));

        let form = client
            .post("http://localhost/")
            .form(&[("code", "200"), ("sleep", "5")])
            .build()
            .unwrap();
        assert_eq!(form.headers()[CONTENT_TYPE], "application/x-www-form-urlencoded");
        assert_eq!(form.body().map(|b| b.as_ref()), Some(&b"code=200&sleep=5"[..]));
    }

    #[test]
    fn test_auth_headers() {
        let client = HttpClient::default();

        let bearer = client.get("http://localhost/").bearer_auth("token").build().unwrap();
        assert_eq!(bearer.headers()[AUTHORIZATION], "Bearer token");

        let basic = client
            .get("http://localhost/")
            .basic_auth("user", Some("pass"))
            .build()
            .unwrap();
        assert_eq!(basic.headers()[AUTHORIZATION], "Basic dXNlcjpwYXNz");

        let no_password = client
            .get("http://localhost/")
            .basic_auth("user", None::<String>)
            .build()
            .unwrap();
        assert_eq!(no_password.headers()[AUTHORIZATION], "Basic dXNlcjo=");
    }

    #[test]
    fn test_queries_append_in_order() {
        let client = HttpClient::default();
        let request = client
            .get("http://localhost/200?a=1")
            .queries([("b", "2"), ("c", "3")])
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("a=1&b=2&c=3"));
    }

    #[test]
    fn test_redirected_keeps_get_and_headers_on_same_host() {
        let request = Request::new(Method::GET, Url::parse("http://localhost/a").unwrap())
            .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer t"));

        let next = request.redirected(
            StatusCode::MOVED_PERMANENTLY,
            Url::parse("http://localhost/b").unwrap(),
        );

        assert_eq!(next.method(), Method::GET);
        assert_eq!(next.url().path(), "/b");
        assert_eq!(next.headers()[AUTHORIZATION], "Bearer t");
    }

    #[test]
    fn test_redirected_found_keeps_put_but_drops_body() {
        let request = Request::new(Method::PUT, Url::parse("http://localhost/a").unwrap())
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_body("x");

        let next = request.redirected(StatusCode::FOUND, Url::parse("http://localhost/b").unwrap());

        assert_eq!(next.method(), Method::PUT);
        assert!(next.body().is_none());
        assert!(!next.headers().contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_redirected_see_other_keeps_head() {
        let request = Request::new(Method::HEAD, Url::parse("http://localhost/a").unwrap());
        let next = request.redirected(StatusCode::SEE_OTHER, Url::parse("http://localhost/b").unwrap());
        assert_eq!(next.method(), Method::HEAD);
    }
}
