//! In-memory metrics provider for tests and local inspection

use crate::error::{TelemetryError, TelemetryResult};
use crate::metrics::{Counter, Histogram, MetricsProvider, UpDownCounter};
use opentelemetry::{Context, KeyValue};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// One recorded value together with its attributes and context
#[derive(Debug, Clone)]
pub struct Emission {
    /// Delta or sample
    pub value: i64,
    /// Attributes attached to the call
    pub attributes: Vec<KeyValue>,
    /// Context the value was recorded in
    pub context: Context,
}

impl Emission {
    /// Look up an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&opentelemetry::Value> {
        self.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }
}

#[derive(Default)]
struct Store {
    emissions: BTreeMap<String, Vec<Emission>>,
    units: BTreeMap<String, String>,
}

/// Provider that keeps every emission in memory.
///
/// Clones share the same store, so a clone can be handed to the code under
/// test while the original is used for assertions.
#[derive(Clone, Default)]
pub struct InMemoryMetricsProvider {
    store: Arc<Mutex<Store>>,
    refused: Arc<HashSet<String>>,
}

impl InMemoryMetricsProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create the instrument called `name`
    pub fn fail_on(mut self, name: impl Into<String>) -> Self {
        let mut refused = (*self.refused).clone();
        refused.insert(name.into());
        self.refused = Arc::new(refused);
        self
    }

    /// Names of all created instruments
    pub fn instruments(&self) -> Vec<String> {
        self.store.lock().emissions.keys().cloned().collect()
    }

    /// Every emission recorded for `name`
    pub fn emissions(&self, name: &str) -> Vec<Emission> {
        self.store
            .lock()
            .emissions
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Sum of all values recorded for `name`
    pub fn sum(&self, name: &str) -> i64 {
        self.emissions(name).iter().map(|e| e.value).sum()
    }

    /// Number of calls recorded for `name`
    pub fn count(&self, name: &str) -> usize {
        self.emissions(name).len()
    }

    /// Unit the histogram `name` was created with
    pub fn unit(&self, name: &str) -> Option<String> {
        self.store.lock().units.get(name).cloned()
    }

    fn register(&self, name: &str) -> TelemetryResult<Arc<Recorder>> {
        if self.refused.contains(name) {
            return Err(TelemetryError::instrument(name, "refused by provider"));
        }
        self.store
            .lock()
            .emissions
            .entry(name.to_string())
            .or_default();
        Ok(Arc::new(Recorder {
            name: name.to_string(),
            store: Arc::clone(&self.store),
        }))
    }
}

struct Recorder {
    name: String,
    store: Arc<Mutex<Store>>,
}

impl Recorder {
    fn push(&self, cx: &Context, value: i64, attributes: &[KeyValue]) {
        self.store
            .lock()
            .emissions
            .entry(self.name.clone())
            .or_default()
            .push(Emission {
                value,
                attributes: attributes.to_vec(),
                context: cx.clone(),
            });
    }
}

impl Counter for Recorder {
    fn add(&self, cx: &Context, value: u64, attributes: &[KeyValue]) {
        self.push(cx, i64::try_from(value).unwrap_or(i64::MAX), attributes);
    }
}

impl UpDownCounter for Recorder {
    fn add(&self, cx: &Context, value: i64, attributes: &[KeyValue]) {
        self.push(cx, value, attributes);
    }
}

impl Histogram for Recorder {
    fn record(&self, cx: &Context, value: u64, attributes: &[KeyValue]) {
        self.push(cx, i64::try_from(value).unwrap_or(i64::MAX), attributes);
    }
}

impl MetricsProvider for InMemoryMetricsProvider {
    fn counter(&self, name: &str) -> TelemetryResult<Arc<dyn Counter>> {
        Ok(self.register(name)?)
    }

    fn up_down_counter(&self, name: &str) -> TelemetryResult<Arc<dyn UpDownCounter>> {
        Ok(self.register(name)?)
    }

    fn histogram(&self, name: &str, unit: &str) -> TelemetryResult<Arc<dyn Histogram>> {
        let recorder = self.register(name)?;
        self.store
            .lock()
            .units
            .insert(name.to_string(), unit.to_string());
        Ok(recorder)
    }
}
