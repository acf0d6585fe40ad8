//! Metric sink contracts.
//!
//! The core never aggregates or serializes metrics itself. It registers three
//! instruments through [`MetricSink`] and updates them through the returned
//! handles. Implementations must be safe for concurrent updates from many
//! requests at once; handles take label values positionally, in the order of
//! [`MetricDesc::label_names`].

use std::sync::Arc;

use crate::error::Result;
use crate::labels::ConstLabels;

/// Everything a sink needs to register one labeled instrument.
#[derive(Debug, Clone)]
pub struct MetricDesc {
    /// Fully-qualified metric name.
    pub name: String,
    /// Help text.
    pub help: &'static str,
    /// Labels fixed at construction time, attached to every series.
    pub const_labels: ConstLabels,
    /// Names of the per-observation labels.
    pub label_names: &'static [&'static str],
}

/// Labeled monotonic counter.
pub trait CounterHandle: Send + Sync {
    fn inc(&self, values: &[&str]);
}

/// Labeled histogram with fixed buckets.
pub trait HistogramHandle: Send + Sync {
    fn observe(&self, values: &[&str], v: f64);
}

/// Labeled up/down gauge.
pub trait GaugeHandle: Send + Sync {
    fn inc(&self, values: &[&str]);
    fn dec(&self, values: &[&str]);
}

/// Registration side of a metrics backend.
///
/// Registering a name twice on the same sink must fail; the error surfaces at
/// startup instead of silently merging two services' series.
/// [`MetricSink::unregister`] takes back a registration made with the same
/// descriptor, so a partially registered set can be rolled back.
pub trait MetricSink: Send + Sync {
    fn register_counter(&self, desc: MetricDesc) -> Result<Arc<dyn CounterHandle>>;
    fn register_histogram(
        &self,
        desc: MetricDesc,
        buckets: &[f64],
    ) -> Result<Arc<dyn HistogramHandle>>;
    fn register_gauge(&self, desc: MetricDesc) -> Result<Arc<dyn GaugeHandle>>;
    fn unregister(&self, desc: &MetricDesc) -> Result<()>;
}

/// Scrape side of a metrics backend.
pub trait Exposition: Send + Sync {
    /// Render every registered metric in the text exposition format.
    fn render(&self) -> Result<String>;

    /// `Content-Type` of [`Exposition::render`] output.
    fn content_type(&self) -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }
}
