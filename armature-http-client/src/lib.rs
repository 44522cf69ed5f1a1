//! # Armature HTTP Client
//!
//! An HTTP client whose requests all pass through a pluggable [`Transport`].
//!
//! ## Features
//!
//! - **Pluggable transports**: a single `round_trip` capability that decorators can wrap
//! - **Timeouts**: Per-request and client-wide timeout configuration
//! - **Cancellation**: Requests carry an optional cancellation token
//! - **Redirects**: Followed by the client, one transport round trip per hop
//! - **Connection Pooling**: Efficient connection reuse through reqwest
//! - **Compression**: Automatic gzip/brotli support
//! - **Status service client**: A small typed client for `httpstat.us` style endpoints
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use armature_http_client::{HttpClient, HttpClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new(HttpClientConfig::default());
//!
//!     let response = client
//!         .get("https://api.example.com/users")
//!         .send()
//!         .await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Transport
//!
//! ```rust,no_run
//! use armature_http_client::{
//!     async_trait, HttpClient, HttpClientConfig, Request, Response, Result, Transport,
//! };
//! use std::sync::Arc;
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl Transport for Offline {
//!     async fn round_trip(&self, request: Request) -> Result<Response> {
//!         Ok(Response::builder(request.url().clone()).build())
//!     }
//! }
//!
//! let client = HttpClient::with_transport(HttpClientConfig::default(), Arc::new(Offline));
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;
mod transport;
pub mod status;

pub use client::HttpClient;
pub use config::{DEFAULT_MAX_REDIRECTS, HttpClientConfig, HttpClientConfigBuilder, RedirectPolicy};
pub use error::{HttpClientError, Result, CONTEXT_CANCELED};
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
pub use transport::{default_transport, ReqwestTransport, ReqwestTransportBuilder, Transport};

// Re-export common types
pub use async_trait::async_trait;
pub use http::{Method, StatusCode, Version, HeaderMap, HeaderValue, header};
pub use tokio_util::sync::CancellationToken;
pub use url::Url;
pub use bytes::Bytes;

/// Prelude for common imports.
///
/// ```
/// use armature_http_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::HttpClient;
    pub use crate::config::{HttpClientConfig, HttpClientConfigBuilder};
    pub use crate::error::{HttpClientError, Result};
    pub use crate::request::{Request, RequestBuilder};
    pub use crate::response::Response;
    pub use crate::transport::{default_transport, ReqwestTransport, Transport};
    pub use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
}
