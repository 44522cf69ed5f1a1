//! Metrics instrumentation for Armature HTTP transports
//!
//! This crate wraps any [`armature_http_client::Transport`] in a decorator that
//! records one set of metrics per round trip:
//! - Attempts, in-flight requests and total duration
//! - Successes, failures (status 400 and above) and redirects (3xx)
//! - Transport errors, split into timeouts and cancellations
//!
//! Instruments come from a [`MetricsProvider`]. [`OtelMetricsProvider`] forwards
//! to an OpenTelemetry meter, [`NoopMetricsProvider`] records nothing, and
//! [`testing::InMemoryMetricsProvider`] keeps everything in memory for assertions.
//!
//! # Examples
//!
//! ## Configuration
//!
//! ```
//! use armature_http_telemetry::TransportConfig;
//! use opentelemetry::KeyValue;
//!
//! let config = TransportConfig::builder()
//!     .with_name("billing.client")
//!     .with_attributes([KeyValue::new("service.name", "billing")])
//!     .build();
//!
//! assert_eq!(config.name(), "billing.client");
//! assert_eq!(config.attributes().len(), 1);
//!
//! // Blank names keep the default prefix
//! let config = TransportConfig::builder().with_name("  ").build();
//! assert_eq!(config.name(), "http.client");
//! ```
//!
//! ## Inspecting emitted metrics
//!
//! ```
//! use armature_http_client::{Method, Request, Response, Result, Transport, Url, async_trait};
//! use armature_http_telemetry::{InstrumentedTransport, MetricsProvider, TransportConfig};
//! use armature_http_telemetry::testing::InMemoryMetricsProvider;
//! use std::sync::Arc;
//!
//! struct Ok200;
//!
//! #[async_trait]
//! impl Transport for Ok200 {
//!     async fn round_trip(&self, request: Request) -> Result<Response> {
//!         Ok(Response::builder(request.url().clone()).build())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let provider = InMemoryMetricsProvider::new();
//! let config = TransportConfig::builder()
//!     .with_parent(Arc::new(Ok200) as Arc<dyn Transport>)
//!     .with_meter(Arc::new(provider.clone()) as Arc<dyn MetricsProvider>)
//!     .build();
//!
//! let transport = InstrumentedTransport::new(config)?;
//! let url = Url::parse("http://localhost/health")?;
//! transport.round_trip(Request::new(Method::GET, url)).await?;
//!
//! assert_eq!(provider.sum("http.client.attempts"), 1);
//! assert_eq!(provider.sum("http.client.success"), 1);
//! assert_eq!(provider.sum("http.client.in_flight"), 0);
//! # Ok(())
//! # }
//! ```

pub mod attributes;
mod config;
mod error;
pub mod metrics;
pub mod testing;
mod transport;

pub use config::{DEFAULT_NAME, TransportConfig, TransportConfigBuilder};
pub use error::{TelemetryError, TelemetryResult};
pub use metrics::{
    Counter, Histogram, HttpClientMetrics, MetricsProvider, NoopMetricsProvider,
    OtelMetricsProvider, UpDownCounter, metric_names,
};
pub use transport::{InstrumentedTransport, Outcome, is_failure, is_redirection};

// Re-export commonly used OpenTelemetry types
pub use opentelemetry::{Context, KeyValue};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{TransportConfig, TransportConfigBuilder};
    pub use crate::error::{TelemetryError, TelemetryResult};
    pub use crate::metrics::{MetricsProvider, NoopMetricsProvider, OtelMetricsProvider};
    pub use crate::transport::InstrumentedTransport;
    pub use opentelemetry::{Context, KeyValue};
}
