//! Metrics provider capability and the HTTP client instrument set

use crate::error::{TelemetryError, TelemetryResult};
use opentelemetry::{Context, KeyValue, global};
use std::sync::Arc;

/// Meter name used when no meter is configured explicitly
pub const DEFAULT_METER_NAME: &str = "http.client";

/// Longest instrument name accepted by [`validate_instrument_name`]
pub const MAX_INSTRUMENT_NAME_LEN: usize = 255;

/// Suffixes appended to the configured prefix for each instrument
pub mod metric_names {
    /// Round trips started
    pub const ATTEMPTS: &str = ".attempts";
    /// Round trips started without a request
    pub const NO_REQUEST: &str = ".no_request";
    /// Round trips that ended in a transport error
    pub const ERRORS: &str = ".errors";
    /// Round trips with a status below 300
    pub const SUCCESS: &str = ".success";
    /// Round trips with a status of 400 or above
    pub const FAILURES: &str = ".failures";
    /// Round trips with a 3xx status
    pub const REDIRECTS: &str = ".redirects";
    /// Transport errors flagged as timeouts
    pub const TIMEOUTS: &str = ".timeouts";
    /// Transport errors caused by cancellation
    pub const CANCELLED: &str = ".cancelled";
    /// Deadline-exceeded errors
    pub const DEADLINE_EXCEEDED: &str = ".deadline_exceeded";
    /// Round-trip duration in milliseconds
    pub const TOTAL_DURATION: &str = ".total_duration";
    /// Round trips currently executing
    pub const IN_FLIGHT: &str = ".in_flight";

    /// Join a prefix and a suffix.
    pub fn full(prefix: &str, suffix: &str) -> String {
        format!("{prefix}{suffix}")
    }
}

/// Monotonic counter
pub trait Counter: Send + Sync {
    /// Add `value` under the given context and attributes
    fn add(&self, cx: &Context, value: u64, attributes: &[KeyValue]);
}

/// Counter that can go up and down
pub trait UpDownCounter: Send + Sync {
    /// Add `value` (possibly negative) under the given context and attributes
    fn add(&self, cx: &Context, value: i64, attributes: &[KeyValue]);
}

/// Distribution of recorded values
pub trait Histogram: Send + Sync {
    /// Record one sample under the given context and attributes
    fn record(&self, cx: &Context, value: u64, attributes: &[KeyValue]);
}

/// Facility that creates named instruments.
///
/// Instruments must tolerate concurrent calls; callers never lock around them.
pub trait MetricsProvider: Send + Sync {
    /// Create a counter
    fn counter(&self, name: &str) -> TelemetryResult<Arc<dyn Counter>>;

    /// Create an up/down counter
    fn up_down_counter(&self, name: &str) -> TelemetryResult<Arc<dyn UpDownCounter>>;

    /// Create a histogram measured in `unit`
    fn histogram(&self, name: &str, unit: &str) -> TelemetryResult<Arc<dyn Histogram>>;
}

/// Check an instrument name against the OpenTelemetry naming rules.
///
/// Names start with an ASCII letter, continue with letters, digits, `_`, `.`,
/// `-` or `/`, and are at most [`MAX_INSTRUMENT_NAME_LEN`] bytes long.
pub fn validate_instrument_name(name: &str) -> TelemetryResult<()> {
    if name.is_empty() {
        return Err(TelemetryError::instrument(name, "name is empty"));
    }
    if name.len() > MAX_INSTRUMENT_NAME_LEN {
        return Err(TelemetryError::instrument(
            name,
            format!("name is longer than {MAX_INSTRUMENT_NAME_LEN} characters"),
        ));
    }

    let mut chars = name.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err(TelemetryError::instrument(name, "name must start with a letter"));
    }
    if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'))) {
        return Err(TelemetryError::instrument(
            name,
            format!("invalid character {c:?}"),
        ));
    }

    Ok(())
}

/// Provider whose instruments record nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsProvider;

#[derive(Debug, Clone, Copy, Default)]
struct NoopInstrument;

impl Counter for NoopInstrument {
    fn add(&self, _cx: &Context, _value: u64, _attributes: &[KeyValue]) {}
}

impl UpDownCounter for NoopInstrument {
    fn add(&self, _cx: &Context, _value: i64, _attributes: &[KeyValue]) {}
}

impl Histogram for NoopInstrument {
    fn record(&self, _cx: &Context, _value: u64, _attributes: &[KeyValue]) {}
}

impl MetricsProvider for NoopMetricsProvider {
    fn counter(&self, _name: &str) -> TelemetryResult<Arc<dyn Counter>> {
        Ok(Arc::new(NoopInstrument))
    }

    fn up_down_counter(&self, _name: &str) -> TelemetryResult<Arc<dyn UpDownCounter>> {
        Ok(Arc::new(NoopInstrument))
    }

    fn histogram(&self, _name: &str, _unit: &str) -> TelemetryResult<Arc<dyn Histogram>> {
        Ok(Arc::new(NoopInstrument))
    }
}

/// Provider backed by an OpenTelemetry [`Meter`](opentelemetry::metrics::Meter)
#[derive(Debug, Clone)]
pub struct OtelMetricsProvider {
    meter: opentelemetry::metrics::Meter,
}

impl OtelMetricsProvider {
    /// Wrap a meter
    pub fn new(meter: opentelemetry::metrics::Meter) -> Self {
        Self { meter }
    }

    /// Use the globally installed meter provider
    pub fn global() -> Self {
        Self::new(global::meter(DEFAULT_METER_NAME))
    }
}

struct OtelInstrument<I>(I);

/// Run `record` with `cx` as the current context.
fn in_context<R>(cx: &Context, record: impl FnOnce() -> R) -> R {
    let _guard = cx.clone().attach();
    record()
}

impl Counter for OtelInstrument<opentelemetry::metrics::Counter<u64>> {
    fn add(&self, cx: &Context, value: u64, attributes: &[KeyValue]) {
        in_context(cx, || self.0.add(value, attributes));
    }
}

impl UpDownCounter for OtelInstrument<opentelemetry::metrics::UpDownCounter<i64>> {
    fn add(&self, cx: &Context, value: i64, attributes: &[KeyValue]) {
        in_context(cx, || self.0.add(value, attributes));
    }
}

impl Histogram for OtelInstrument<opentelemetry::metrics::Histogram<u64>> {
    fn record(&self, cx: &Context, value: u64, attributes: &[KeyValue]) {
        in_context(cx, || self.0.record(value, attributes));
    }
}

impl MetricsProvider for OtelMetricsProvider {
    fn counter(&self, name: &str) -> TelemetryResult<Arc<dyn Counter>> {
        validate_instrument_name(name)?;
        let counter = self.meter.u64_counter(name.to_owned()).build();
        Ok(Arc::new(OtelInstrument(counter)))
    }

    fn up_down_counter(&self, name: &str) -> TelemetryResult<Arc<dyn UpDownCounter>> {
        validate_instrument_name(name)?;
        let counter = self.meter.i64_up_down_counter(name.to_owned()).build();
        Ok(Arc::new(OtelInstrument(counter)))
    }

    fn histogram(&self, name: &str, unit: &str) -> TelemetryResult<Arc<dyn Histogram>> {
        validate_instrument_name(name)?;
        let histogram = self
            .meter
            .u64_histogram(name.to_owned())
            .with_unit(unit.to_owned())
            .build();
        Ok(Arc::new(OtelInstrument(histogram)))
    }
}

/// The instruments emitted for every round trip
#[derive(Clone)]
pub struct HttpClientMetrics {
    /// Round trips started, absent requests included
    pub attempts: Arc<dyn Counter>,
    /// Calls made without a request
    pub no_request: Arc<dyn Counter>,
    /// Round trips that ended in a transport error
    pub errors: Arc<dyn Counter>,
    /// Responses below 300
    pub successes: Arc<dyn Counter>,
    /// Responses of 400 and above
    pub failures: Arc<dyn Counter>,
    /// 3xx responses
    pub redirects: Arc<dyn Counter>,
    /// Errors that report a timeout
    pub timeouts: Arc<dyn Counter>,
    /// Errors caused by a cancelled request
    pub canceled: Arc<dyn Counter>,
    /// Created but never incremented
    pub deadline_exceeded: Arc<dyn Counter>,
    /// Milliseconds spent in the parent transport, responses only
    pub total_duration: Arc<dyn Histogram>,
    /// Round trips currently waiting on the parent
    pub in_flight: Arc<dyn UpDownCounter>,
}

impl HttpClientMetrics {
    /// Create every instrument under `prefix`. Fails on the first refusal.
    pub fn new(meter: &dyn MetricsProvider, prefix: &str) -> TelemetryResult<Self> {
        use metric_names::*;

        let counter = |suffix: &str| meter.counter(&full(prefix, suffix));

        Ok(Self {
            no_request: counter(NO_REQUEST)?,
            errors: counter(ERRORS)?,
            successes: counter(SUCCESS)?,
            timeouts: counter(TIMEOUTS)?,
            canceled: counter(CANCELLED)?,
            deadline_exceeded: counter(DEADLINE_EXCEEDED)?,
            total_duration: meter.histogram(&full(prefix, TOTAL_DURATION), "ms")?,
            in_flight: meter.up_down_counter(&full(prefix, IN_FLIGHT))?,
            attempts: counter(ATTEMPTS)?,
            failures: counter(FAILURES)?,
            redirects: counter(REDIRECTS)?,
        })
    }

    /// Instruments that record nothing
    pub fn noop() -> Self {
        let noop = Arc::new(NoopInstrument);
        Self {
            attempts: noop.clone(),
            no_request: noop.clone(),
            errors: noop.clone(),
            successes: noop.clone(),
            failures: noop.clone(),
            redirects: noop.clone(),
            timeouts: noop.clone(),
            canceled: noop.clone(),
            deadline_exceeded: noop.clone(),
            total_duration: noop.clone(),
            in_flight: noop,
        }
    }
}

impl std::fmt::Debug for HttpClientMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientMetrics").finish_non_exhaustive()
    }
}
