//! `prometheus` crate backend.
//!
//! Registration errors from the client library are mapped onto
//! `ReqMeterError`; observations use the non-panicking label lookups and only
//! log on failure.

use std::collections::HashMap;
use std::sync::Arc;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use reqmeter_core::error::{ReqMeterError, Result};
use reqmeter_core::labels::ConstLabels;
use reqmeter_core::sink::{
    CounterHandle, Exposition, GaugeHandle, HistogramHandle, MetricDesc, MetricSink,
};

fn map_err(name: &str, e: prometheus::Error) -> ReqMeterError {
    match e {
        prometheus::Error::AlreadyReg => ReqMeterError::AlreadyRegistered(name.to_string()),
        prometheus::Error::InconsistentCardinality { .. } => {
            ReqMeterError::SchemaMismatch(name.to_string())
        }
        other => ReqMeterError::Sink(format!("{name}: {other}")),
    }
}

fn const_labels(labels: &ConstLabels) -> HashMap<String, String> {
    labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn opts(desc: &MetricDesc) -> Opts {
    Opts::new(desc.name.as_str(), desc.help).const_labels(const_labels(&desc.const_labels))
}

/// Sink over a `prometheus::Registry` (cheap to clone, shared internally).
#[derive(Clone, Default)]
pub struct PrometheusSink {
    registry: Registry,
}

impl PrometheusSink {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn register<C>(&self, name: &str, collector: &C) -> Result<()>
    where
        C: prometheus::core::Collector + Clone + 'static,
    {
        self.registry
            .register(Box::new(collector.clone()))
            .map_err(|e| map_err(name, e))
    }
}

struct Counter(IntCounterVec);

impl CounterHandle for Counter {
    fn inc(&self, values: &[&str]) {
        match self.0.get_metric_with_label_values(values) {
            Ok(c) => c.inc(),
            Err(e) => tracing::warn!(error = %e, "prometheus counter update dropped"),
        }
    }
}

struct Histogram(HistogramVec);

impl HistogramHandle for Histogram {
    fn observe(&self, values: &[&str], v: f64) {
        match self.0.get_metric_with_label_values(values) {
            Ok(h) => h.observe(v),
            Err(e) => tracing::warn!(error = %e, "prometheus histogram update dropped"),
        }
    }
}

struct Gauge(IntGaugeVec);

impl GaugeHandle for Gauge {
    fn inc(&self, values: &[&str]) {
        match self.0.get_metric_with_label_values(values) {
            Ok(g) => g.inc(),
            Err(e) => tracing::warn!(error = %e, "prometheus gauge update dropped"),
        }
    }

    fn dec(&self, values: &[&str]) {
        match self.0.get_metric_with_label_values(values) {
            Ok(g) => g.dec(),
            Err(e) => tracing::warn!(error = %e, "prometheus gauge update dropped"),
        }
    }
}

impl MetricSink for PrometheusSink {
    fn register_counter(&self, desc: MetricDesc) -> Result<Arc<dyn CounterHandle>> {
        let vec = IntCounterVec::new(opts(&desc), desc.label_names)
            .map_err(|e| map_err(&desc.name, e))?;
        self.register(&desc.name, &vec)?;
        Ok(Arc::new(Counter(vec)))
    }

    fn register_histogram(
        &self,
        desc: MetricDesc,
        buckets: &[f64],
    ) -> Result<Arc<dyn HistogramHandle>> {
        let hopts = HistogramOpts::new(desc.name.as_str(), desc.help)
            .const_labels(const_labels(&desc.const_labels))
            .buckets(buckets.to_vec());
        let vec = HistogramVec::new(hopts, desc.label_names).map_err(|e| map_err(&desc.name, e))?;
        self.register(&desc.name, &vec)?;
        Ok(Arc::new(Histogram(vec)))
    }

    fn register_gauge(&self, desc: MetricDesc) -> Result<Arc<dyn GaugeHandle>> {
        let vec = IntGaugeVec::new(opts(&desc), desc.label_names)
            .map_err(|e| map_err(&desc.name, e))?;
        self.register(&desc.name, &vec)?;
        Ok(Arc::new(Gauge(vec)))
    }

    /// The registry matches collectors by descriptor (name, help, labels), so
    /// a fresh vec built from the same `desc` stands in for the original.
    fn unregister(&self, desc: &MetricDesc) -> Result<()> {
        let vec = IntGaugeVec::new(opts(desc), desc.label_names)
            .map_err(|e| map_err(&desc.name, e))?;
        self.registry
            .unregister(Box::new(vec))
            .map_err(|e| map_err(&desc.name, e))
    }
}

impl Exposition for PrometheusSink {
    fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| ReqMeterError::Sink(format!("encode metrics: {e}")))?;
        String::from_utf8(buf).map_err(|e| ReqMeterError::Sink(format!("metrics not utf-8: {e}")))
    }

    fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
