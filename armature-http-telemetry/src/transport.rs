//! Transport decorator that emits metrics for every round trip

use crate::attributes::{extend, request_attributes, response_attributes};
use crate::config::{TransportConfig, TransportConfigBuilder};
use crate::error::TelemetryResult;
use crate::metrics::HttpClientMetrics;
use armature_http_client::{
    CONTEXT_CANCELED, HttpClientError, Request, Response, Result, StatusCode, Transport,
};
use async_trait::async_trait;
use opentelemetry::{Context, KeyValue};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// How a round trip ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The parent returned an error
    Error {
        /// The error carries a timeout indicator
        timeout: bool,
        /// The error message ends with the cancellation marker
        canceled: bool,
    },
    /// 3xx response
    Redirect,
    /// Response with a status of 400 or above
    Failure,
    /// Any other response
    Success,
}

impl Outcome {
    /// Classify a transport error. Both flags may be set at once.
    pub fn of_error(err: &HttpClientError) -> Self {
        Self::Error {
            timeout: err.is_timeout(),
            canceled: err.to_string().ends_with(CONTEXT_CANCELED),
        }
    }

    /// Classify a response by status code. A missing response counts as success.
    pub fn of_response(response: Option<&Response>) -> Self {
        if is_redirection(response) {
            Self::Redirect
        } else if is_failure(response) {
            Self::Failure
        } else {
            Self::Success
        }
    }
}

/// Status in `[300, 400)`.
pub fn is_redirection(response: Option<&Response>) -> bool {
    response.is_some_and(|r| {
        r.status() >= StatusCode::MULTIPLE_CHOICES && r.status() < StatusCode::BAD_REQUEST
    })
}

/// Status of 400 or above.
pub fn is_failure(response: Option<&Response>) -> bool {
    response.is_some_and(|r| r.status() >= StatusCode::BAD_REQUEST)
}

/// A [`Transport`] that wraps another transport and records metrics for
/// every round trip it forwards.
///
/// The wrapped transport sees the original request, and the caller receives
/// exactly what the wrapped transport returned. The decorator only observes.
///
/// ```no_run
/// use armature_http_client::{HttpClient, HttpClientConfig};
/// use armature_http_telemetry::{InstrumentedTransport, OtelMetricsProvider, TransportConfig};
/// use opentelemetry::KeyValue;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TransportConfig::builder()
///     .with_name("status.client")
///     .with_meter(Arc::new(OtelMetricsProvider::global()) as Arc<_>)
///     .with_attributes([KeyValue::new("service.name", "status-checker")])
///     .build();
///
/// let transport = InstrumentedTransport::new(config)?;
/// let client = HttpClient::with_transport(HttpClientConfig::default(), Arc::new(transport));
/// # Ok(())
/// # }
/// ```
pub struct InstrumentedTransport {
    name: String,
    parent: Arc<dyn Transport>,
    attributes: Vec<KeyValue>,
    metrics: HttpClientMetrics,
}

impl InstrumentedTransport {
    /// Create the transport and all of its instruments.
    ///
    /// Fails when the metrics provider refuses any instrument; nothing is
    /// recorded in that case.
    pub fn new(config: TransportConfig) -> TelemetryResult<Self> {
        let (name, parent, meter, attributes) = config.into_parts();
        let metrics = HttpClientMetrics::new(meter.as_ref(), &name)?;

        debug!(
            name = %name,
            attributes = attributes.len(),
            "Instrumented HTTP transport ready"
        );

        Ok(Self {
            name,
            parent,
            attributes,
            metrics,
        })
    }

    /// Build the configuration from `options` and create the transport.
    pub fn from_options(options: TransportConfigBuilder) -> TelemetryResult<Self> {
        Self::new(options.build())
    }

    /// Wrap the default transport and record nothing.
    pub fn with_defaults() -> Self {
        let (name, parent, _, attributes) = TransportConfig::default().into_parts();
        Self {
            name,
            parent,
            attributes,
            metrics: HttpClientMetrics::noop(),
        }
    }

    /// Metric name prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped transport
    pub fn parent(&self) -> &Arc<dyn Transport> {
        &self.parent
    }

    /// Execute one round trip through the parent transport.
    ///
    /// A missing request is counted and then rejected with
    /// [`HttpClientError::MissingRequest`] without reaching the parent.
    pub async fn execute(&self, request: Option<Request>) -> Result<Response> {
        let cx = extract_context(request.as_ref());
        let attributes = extend(&self.attributes, request_attributes(request.as_ref()));

        if request.is_none() {
            self.metrics.no_request.add(&cx, 1, &attributes);
        }

        self.before_hook(&cx, &attributes);

        let start = Instant::now();
        let result = match request {
            Some(request) => self.parent.round_trip(request).await,
            None => Err(HttpClientError::MissingRequest),
        };
        let duration = elapsed_millis(start);

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.error_hook(&cx, Outcome::of_error(&err), &attributes);
                return Err(err);
            }
        };

        let attributes = extend(&attributes, response_attributes(Some(&response)));
        self.after_hook(&cx, duration, &attributes);

        match Outcome::of_response(Some(&response)) {
            Outcome::Redirect => self.redirect_hook(&cx, &attributes),
            Outcome::Failure => self.failure_hook(&cx, &attributes),
            _ => self.success_hook(&cx, &attributes),
        }

        Ok(response)
    }

    fn before_hook(&self, cx: &Context, attributes: &[KeyValue]) {
        self.metrics.in_flight.add(cx, 1, attributes);
        self.metrics.attempts.add(cx, 1, attributes);
    }

    fn error_hook(&self, cx: &Context, outcome: Outcome, attributes: &[KeyValue]) {
        self.metrics.in_flight.add(cx, -1, attributes);
        self.metrics.errors.add(cx, 1, attributes);

        if let Outcome::Error { timeout, canceled } = outcome {
            if timeout {
                self.metrics.timeouts.add(cx, 1, attributes);
            }
            if canceled {
                self.metrics.canceled.add(cx, 1, attributes);
            }
        }
    }

    fn after_hook(&self, cx: &Context, duration: u64, attributes: &[KeyValue]) {
        self.metrics.total_duration.record(cx, duration, attributes);
    }

    fn redirect_hook(&self, cx: &Context, attributes: &[KeyValue]) {
        self.metrics.in_flight.add(cx, -1, attributes);
        self.metrics.redirects.add(cx, 1, attributes);
    }

    fn failure_hook(&self, cx: &Context, attributes: &[KeyValue]) {
        self.metrics.in_flight.add(cx, -1, attributes);
        self.metrics.failures.add(cx, 1, attributes);
    }

    fn success_hook(&self, cx: &Context, attributes: &[KeyValue]) {
        self.metrics.in_flight.add(cx, -1, attributes);
        self.metrics.successes.add(cx, 1, attributes);
    }
}

impl Default for InstrumentedTransport {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for InstrumentedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedTransport")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for InstrumentedTransport {
    async fn round_trip(&self, request: Request) -> Result<Response> {
        self.execute(Some(request)).await
    }
}

/// The request's own context, or an empty one.
fn extract_context(request: Option<&Request>) -> Context {
    request
        .and_then(|r| r.extensions().get::<Context>())
        .cloned()
        .unwrap_or_else(Context::new)
}

fn elapsed_millis(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
