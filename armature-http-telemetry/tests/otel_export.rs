//! Round trips recorded through the OpenTelemetry SDK and read back from an
//! in-memory exporter.

use armature_http_client::{
    HttpClientError, Method, Request, Response, Result, StatusCode, Transport, Url, async_trait,
};
use armature_http_telemetry::{InstrumentedTransport, MetricsProvider, OtelMetricsProvider, TransportConfig};
use opentelemetry::metrics::MeterProvider;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Answers by path: `/missing` is a 404, `/down` a connection error, anything
/// else a 200.
struct Local;

#[async_trait]
impl Transport for Local {
    async fn round_trip(&self, request: Request) -> Result<Response> {
        let status = match request.url().path() {
            "/missing" => StatusCode::NOT_FOUND,
            "/down" => return Err(HttpClientError::Timeout(Duration::from_millis(1))),
            _ => StatusCode::OK,
        };
        Ok(Response::builder(request.url().clone()).status(status).build())
    }
}

#[derive(Debug, Default)]
struct Exported {
    unit: String,
    value: i64,
    count: u64,
}

struct Harness {
    sdk: SdkMeterProvider,
    exporter: InMemoryMetricExporter,
    transport: InstrumentedTransport,
}

impl Harness {
    fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let reader = PeriodicReader::builder(exporter.clone()).build();
        let sdk = SdkMeterProvider::builder().with_reader(reader).build();

        let meter: Arc<dyn MetricsProvider> =
            Arc::new(OtelMetricsProvider::new(sdk.meter("http.client")));
        let parent: Arc<dyn Transport> = Arc::new(Local);
        let transport = InstrumentedTransport::new(
            TransportConfig::builder()
                .with_parent(parent)
                .with_meter(meter)
                .build(),
        )
        .unwrap();

        Self {
            sdk,
            exporter,
            transport,
        }
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let url = Url::parse("http://localhost").unwrap().join(path).unwrap();
        self.transport.round_trip(Request::new(Method::GET, url)).await
    }

    fn collect(&self) -> HashMap<String, Exported> {
        self.sdk.force_flush().unwrap();

        let mut exported = HashMap::new();
        for resource in self.exporter.get_finished_metrics().unwrap() {
            for scope in resource.scope_metrics() {
                for metric in scope.metrics() {
                    let (value, count) = match metric.data() {
                        AggregatedMetrics::U64(MetricData::Sum(sum)) => {
                            (sum.data_points().map(|p| p.value() as i64).sum(), 0)
                        }
                        AggregatedMetrics::I64(MetricData::Sum(sum)) => {
                            (sum.data_points().map(|p| p.value()).sum(), 0)
                        }
                        AggregatedMetrics::U64(MetricData::Histogram(histogram)) => (
                            histogram.data_points().map(|p| p.sum() as i64).sum(),
                            histogram.data_points().map(|p| p.count() as u64).sum(),
                        ),
                        _ => (0, 0),
                    };
                    exported.insert(
                        metric.name().to_string(),
                        Exported {
                            unit: metric.unit().to_string(),
                            value,
                            count,
                        },
                    );
                }
            }
        }
        exported
    }
}

#[tokio::test]
async fn test_round_trips_reach_the_sdk() {
    let harness = Harness::new();

    harness.get("/ok").await.unwrap();
    harness.get("/missing").await.unwrap();
    harness.get("/down").await.unwrap_err();

    let exported = harness.collect();
    let value = |name: &str| exported.get(name).map(|m| m.value);

    assert_eq!(value("http.client.attempts"), Some(3));
    assert_eq!(value("http.client.success"), Some(1));
    assert_eq!(value("http.client.failures"), Some(1));
    assert_eq!(value("http.client.errors"), Some(1));
    assert_eq!(value("http.client.timeouts"), Some(1));
    assert_eq!(value("http.client.in_flight"), Some(0));

    let duration = &exported["http.client.total_duration"];
    assert_eq!(duration.unit, "ms");
    assert_eq!(duration.count, 2);
}

#[tokio::test]
async fn test_untouched_instruments_are_not_exported() {
    let harness = Harness::new();

    harness.get("/ok").await.unwrap();

    let exported = harness.collect();
    assert!(exported.contains_key("http.client.success"));
    assert!(!exported.contains_key("http.client.redirects"));
    assert!(!exported.contains_key("http.client.deadline_exceeded"));
}
