//! HTTP response wrapper.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};
use serde::de::DeserializeOwned;
use crate::{HttpClientError, Result};

/// HTTP response wrapper.
///
/// The body is buffered, so a response can be inspected by decorators and
/// still be handed to the caller untouched.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    url: url::Url,
}

impl Response {
    /// Start building a response for `url`.
    pub fn builder(url: url::Url) -> ResponseBuilder {
        ResponseBuilder {
            response: Response {
                status: StatusCode::OK,
                version: Version::HTTP_11,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                url,
            },
        }
    }

    /// Create a response from a reqwest response, buffering the body.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            version,
            headers,
            body,
            url,
        })
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version the response was received with.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Protocol string such as `HTTP/1.1`.
    pub fn protocol(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_2 => "HTTP/2.0",
            Version::HTTP_3 => "HTTP/3.0",
            _ => "HTTP/?",
        }
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the response was a redirection (3xx).
    pub fn is_redirection(&self) -> bool {
        self.status.is_redirection()
    }

    /// Check if the response was a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Check if the response was a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the response URL.
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Get the response body as bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response and return the body as bytes.
    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Get the response body as text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| HttpClientError::Json(e.to_string()))
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpClientError::Json(e.to_string()))
    }

    /// Get the content length if available.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Get the content type if available.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Check for an error response and return it.
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            let message = self.text().unwrap_or_else(|_| "Unknown error".to_string());
            Err(HttpClientError::Response {
                status: self.status.as_u16(),
                message,
            })
        } else {
            Ok(self)
        }
    }
}

/// Builder for responses produced outside of reqwest, e.g. by test transports.
#[derive(Debug)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Set the status code.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.response.status = status;
        self
    }

    /// Set the HTTP version.
    pub fn version(mut self, version: Version) -> Self {
        self.response.version = version;
        self
    }

    /// Set a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.response.headers.insert(name, value);
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = body.into();
        self
    }

    /// Finish the response.
    pub fn build(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> url::Url {
        url::Url::parse("http://localhost/200").unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let response = Response::builder(url()).build();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.protocol(), "HTTP/1.1");
        assert!(response.bytes().is_empty());
    }

    #[test]
    fn test_protocol_follows_version() {
        let protocol = |version| Response::builder(url()).version(version).build().protocol();
        assert_eq!(protocol(Version::HTTP_09), "HTTP/0.9");
        assert_eq!(protocol(Version::HTTP_10), "HTTP/1.0");
        assert_eq!(protocol(Version::HTTP_11), "HTTP/1.1");
        assert_eq!(protocol(Version::HTTP_2), "HTTP/2.0");
        assert_eq!(protocol(Version::HTTP_3), "HTTP/3.0");
    }

    #[test]
    fn test_json_body() {
        #[derive(serde::Deserialize)]
        struct Status {
            code: u16,
        }

        let response = Response::builder(url())
            .body(r#"{"code":200,"description":"OK"}"#)
            .build();
        let status: Status = response.json().unwrap();
        assert_eq!(status.code, 200);
    }

    #[test]
    fn test_error_for_status_keeps_body() {
        let response = Response::builder(url())
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body("Internal Server Error")
            .build();

        let err = response.error_for_status().unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn test_redirection_predicate() {
        let response = Response::builder(url())
            .status(StatusCode::MOVED_PERMANENTLY)
            .build();
        assert!(response.is_redirection());
        assert!(!response.is_success());
    }
}
