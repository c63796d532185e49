//! Metric sink for the exporter.
//!
//! The collector does not talk to a registry directly. It reports metric
//! descriptors and observations to a `MetricSink`, bracketed by
//! `begin_cycle`/`finish_cycle`. The production sink records each cycle into
//! a fresh Prometheus recorder and keeps the rendered text of the last
//! finished cycle, so a scrape only ever shows what that cycle produced.

use std::sync::Mutex;
use metrics::{Key, Label, Recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};

/// Prefix shared by every exported metric
pub const NAMESPACE: &str = "qrator";

/// Kind of an exported metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// Static description of one metric family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDesc {
    /// Fully qualified name, namespace included
    pub name: &'static str,
    /// Help text
    pub help: &'static str,
    /// Metric kind
    pub kind: MetricKind,
    /// Label names, in emission order
    pub labels: &'static [&'static str],
}

/// Destination for the collector's output
#[cfg_attr(test, mockall::automock)]
pub trait MetricSink: Send + Sync {
    /// Register a metric family
    fn describe(&self, desc: &MetricDesc);

    /// A collection cycle starts, observations of the previous one are discarded
    fn begin_cycle(&self);

    /// Record the current value of one gauge series
    fn gauge(&self, name: &'static str, labels: &[(&'static str, String)], value: f64);

    /// Record the cumulative value of a process counter
    fn counter(&self, name: &'static str, value: u64);

    /// The cycle is complete, its observations become visible
    fn finish_cycle(&self);
}

/// Sink rendering each collection cycle in the Prometheus text format
pub struct PrometheusSink {
    /// Registered families, replayed into every new recorder
    descriptors: Mutex<Vec<MetricDesc>>,
    /// Recorder of the cycle in progress
    current: Mutex<PrometheusRecorder>,
    /// Output of the last finished cycle
    rendered: Mutex<String>,
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self {
            descriptors: Mutex::new(Vec::new()),
            current: Mutex::new(PrometheusBuilder::new().build_recorder()),
            rendered: Mutex::new(String::new()),
        }
    }
}

impl PrometheusSink {
    /// Text exposition of the last finished cycle, empty before the first one
    pub fn render(&self) -> String {
        lock(&self.rendered).clone()
    }

    fn describe_into(recorder: &PrometheusRecorder, desc: &MetricDesc) {
        match desc.kind {
            MetricKind::Gauge => recorder.describe_gauge(desc.name.into(), None, desc.help.into()),
            MetricKind::Counter => recorder.describe_counter(desc.name.into(), None, desc.help.into()),
        }
    }
}

impl MetricSink for PrometheusSink {
    fn describe(&self, desc: &MetricDesc) {
        let mut descriptors = lock(&self.descriptors);
        if descriptors.iter().any(|known| known.name == desc.name) {
            return;
        }
        descriptors.push(*desc);
        Self::describe_into(&lock(&self.current), desc);
    }

    fn begin_cycle(&self) {
        let recorder = PrometheusBuilder::new().build_recorder();
        for desc in lock(&self.descriptors).iter() {
            Self::describe_into(&recorder, desc);
        }
        *lock(&self.current) = recorder;
    }

    fn gauge(&self, name: &'static str, labels: &[(&'static str, String)], value: f64) {
        let labels: Vec<Label> = labels
            .iter()
            .map(|(key, value)| Label::new(*key, value.clone()))
            .collect();
        let key = Key::from_parts(name, labels);
        lock(&self.current).register_gauge(&key).set(value);
    }

    fn counter(&self, name: &'static str, value: u64) {
        let key = Key::from_name(name);
        lock(&self.current).register_counter(&key).absolute(value);
    }

    fn finish_cycle(&self) {
        let rendered = lock(&self.current).handle().render();
        *lock(&self.rendered) = rendered;
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
