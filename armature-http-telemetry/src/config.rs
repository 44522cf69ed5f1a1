//! Configuration for the instrumented transport

use crate::metrics::{MetricsProvider, NoopMetricsProvider};
use armature_http_client::{Transport, default_transport};
use opentelemetry::KeyValue;
use std::fmt;
use std::sync::Arc;

type ConfigParts = (
    String,
    Arc<dyn Transport>,
    Arc<dyn MetricsProvider>,
    Vec<KeyValue>,
);

/// Metric prefix used when none is configured
pub const DEFAULT_NAME: &str = "http.client";

/// Instrumented transport configuration
///
/// Built once through [`TransportConfigBuilder`] and read-only afterwards.
#[derive(Clone)]
pub struct TransportConfig {
    name: String,
    parent: Arc<dyn Transport>,
    meter: Arc<dyn MetricsProvider>,
    attributes: Vec<KeyValue>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            parent: default_transport(),
            meter: Arc::new(NoopMetricsProvider),
            attributes: Vec::new(),
        }
    }
}

impl TransportConfig {
    /// Create a configuration builder starting from the defaults
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    /// Metric name prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transport that performs the actual round trips
    pub fn parent(&self) -> &Arc<dyn Transport> {
        &self.parent
    }

    /// Provider the instruments are created from
    pub fn meter(&self) -> &Arc<dyn MetricsProvider> {
        &self.meter
    }

    /// Attributes attached to every emission
    pub fn attributes(&self) -> &[KeyValue] {
        &self.attributes
    }

    pub(crate) fn into_parts(self) -> ConfigParts {
        (self.name, self.parent, self.meter, self.attributes)
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TransportConfig`]
///
/// Options apply in call order and later calls win. An option given an empty
/// value leaves the current setting alone instead of failing.
#[derive(Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Set the transport that is wrapped. `None` keeps the current one.
    pub fn with_parent(mut self, parent: impl Into<Option<Arc<dyn Transport>>>) -> Self {
        if let Some(parent) = parent.into() {
            self.config.parent = parent;
        }
        self
    }

    /// Set the metric name prefix. Surrounding whitespace is trimmed and blank
    /// names are ignored.
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        if !name.is_empty() {
            self.config.name = name.to_string();
        }
        self
    }

    /// Set the metrics provider. `None` keeps the current one.
    pub fn with_meter(mut self, meter: impl Into<Option<Arc<dyn MetricsProvider>>>) -> Self {
        if let Some(meter) = meter.into() {
            self.config.meter = meter;
        }
        self
    }

    /// Replace the attributes attached to every emission
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        self.config.attributes = attributes.into_iter().collect();
        self
    }

    /// Build the configuration
    pub fn build(self) -> TransportConfig {
        self.config
    }
}
