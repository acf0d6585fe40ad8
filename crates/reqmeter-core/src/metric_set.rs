//! The three request instruments and their construction.

use std::sync::Arc;

use crate::error::{ReqMeterError, Result};
use crate::labels::{is_valid_metric_name, ConstLabels, IN_FLIGHT_LABELS, REQUEST_LABELS};
use crate::sink::{CounterHandle, GaugeHandle, HistogramHandle, MetricDesc, MetricSink};

pub const DEFAULT_NAMESPACE: &str = "http";

/// Latency buckets in seconds, 1ns .. 30s.
///
/// Wide enough for in-memory handlers and slow downstream calls alike.
pub const DEFAULT_BUCKETS: [f64; 34] = [
    0.000_000_001, // 1ns
    0.000_000_002,
    0.000_000_005,
    0.000_000_01, // 10ns
    0.000_000_02,
    0.000_000_05,
    0.000_000_1, // 100ns
    0.000_000_2,
    0.000_000_5,
    0.000_001, // 1us
    0.000_002,
    0.000_005,
    0.000_01, // 10us
    0.000_02,
    0.000_05,
    0.000_1, // 100us
    0.000_2,
    0.000_5,
    0.001, // 1ms
    0.002,
    0.005,
    0.01, // 10ms
    0.02,
    0.05,
    0.1, // 100ms
    0.2,
    0.5,
    1.0, // 1s
    2.0,
    5.0,
    10.0, // 10s
    15.0,
    20.0,
    30.0,
];

/// Join non-empty name components with `_`.
///
/// `fq_name("http", "", "requests_total") == "http_requests_total"`
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Counter, histogram and gauge shared by every interceptor of one service.
pub struct MetricSet {
    requests_total: Arc<dyn CounterHandle>,
    request_duration: Arc<dyn HistogramHandle>,
    request_in_flight: Arc<dyn GaugeHandle>,
    const_labels: ConstLabels,
    names: [String; 3],
}

impl MetricSet {
    pub fn builder() -> MetricSetBuilder {
        MetricSetBuilder::default()
    }

    /// Register the three instruments on `sink`.
    ///
    /// `extra_labels` become constant labels next to `service` (omitted when
    /// `service_name` is empty).
    pub fn build<I, K, V>(
        sink: &dyn MetricSink,
        service_name: &str,
        namespace: &str,
        subsystem: &str,
        extra_labels: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::builder()
            .service(service_name)
            .namespace(namespace)
            .subsystem(subsystem)
            .labels(extra_labels)
            .build(sink)
    }

    pub fn requests_total(&self) -> &dyn CounterHandle {
        self.requests_total.as_ref()
    }

    pub fn request_duration(&self) -> &dyn HistogramHandle {
        self.request_duration.as_ref()
    }

    pub(crate) fn in_flight_handle(&self) -> Arc<dyn GaugeHandle> {
        Arc::clone(&self.request_in_flight)
    }

    pub fn const_labels(&self) -> &ConstLabels {
        &self.const_labels
    }

    /// Fully-qualified names: requests total, request duration, in progress.
    pub fn names(&self) -> [&str; 3] {
        [
            self.names[0].as_str(),
            self.names[1].as_str(),
            self.names[2].as_str(),
        ]
    }
}

/// Validated construction of a [`MetricSet`].
#[derive(Debug)]
pub struct MetricSetBuilder {
    service: String,
    namespace: String,
    subsystem: String,
    labels: Vec<(String, String)>,
    buckets: Option<Vec<f64>>,
}

impl Default for MetricSetBuilder {
    fn default() -> Self {
        Self {
            service: String::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            subsystem: String::new(),
            labels: Vec::new(),
            buckets: None,
        }
    }
}

impl MetricSetBuilder {
    pub fn service(mut self, name: impl Into<String>) -> Self {
        self.service = name.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    pub fn label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((name.into(), value.into()));
        self
    }

    pub fn labels<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Override [`DEFAULT_BUCKETS`].
    pub fn buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = Some(buckets);
        self
    }

    pub fn build(self, sink: &dyn MetricSink) -> Result<MetricSet> {
        let const_labels = ConstLabels::builder()
            .service(self.service)
            .labels(self.labels)
            .build()?;

        let buckets = match self.buckets {
            Some(b) => {
                validate_buckets(&b)?;
                b
            }
            None => DEFAULT_BUCKETS.to_vec(),
        };

        let names = [
            fq_name(&self.namespace, &self.subsystem, "requests_total"),
            fq_name(&self.namespace, &self.subsystem, "request_duration_seconds"),
            fq_name(&self.namespace, &self.subsystem, "requests_in_progress_total"),
        ];
        if let Some(bad) = names.iter().find(|n| !is_valid_metric_name(n.as_str())) {
            return Err(ReqMeterError::InvalidMetricName(bad.clone()));
        }

        let desc = |name: &str, help: &'static str, label_names: &'static [&'static str]| {
            MetricDesc {
                name: name.to_string(),
                help,
                const_labels: const_labels.clone(),
                label_names,
            }
        };
        let counter_desc = desc(
            names[0].as_str(),
            "Count all http requests by status code, method and path.",
            REQUEST_LABELS,
        );
        let histogram_desc = desc(
            names[1].as_str(),
            "Duration of all HTTP requests by status code, method and path.",
            REQUEST_LABELS,
        );
        let gauge_desc = desc(
            names[2].as_str(),
            "All the requests in progress",
            IN_FLIGHT_LABELS,
        );

        // all three or none
        let requests_total = sink.register_counter(counter_desc.clone())?;
        let request_duration = match sink.register_histogram(histogram_desc.clone(), &buckets) {
            Ok(h) => h,
            Err(e) => return Err(roll_back(sink, &[&counter_desc], e)),
        };
        let request_in_flight = match sink.register_gauge(gauge_desc) {
            Ok(g) => g,
            Err(e) => return Err(roll_back(sink, &[&counter_desc, &histogram_desc], e)),
        };

        tracing::info!(
            requests_total = %names[0],
            buckets = buckets.len(),
            const_labels = const_labels.len(),
            "request metric set registered"
        );

        Ok(MetricSet {
            requests_total,
            request_duration,
            request_in_flight,
            const_labels,
            names,
        })
    }
}

/// Undo the registrations of a failed build; returns the original error.
fn roll_back(
    sink: &dyn MetricSink,
    registered: &[&MetricDesc],
    err: ReqMeterError,
) -> ReqMeterError {
    for desc in registered {
        if let Err(e) = sink.unregister(desc) {
            tracing::warn!(
                metric = %desc.name,
                error = %e,
                "roll back of partial metric set failed"
            );
        }
    }
    err
}

/// Non-empty, finite, strictly increasing.
pub fn validate_buckets(buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(ReqMeterError::InvalidBuckets("must not be empty".into()));
    }
    if let Some(b) = buckets.iter().find(|b| !b.is_finite()) {
        return Err(ReqMeterError::InvalidBuckets(format!("non-finite bound {b}")));
    }
    if let Some(w) = buckets.windows(2).find(|w| w[0] >= w[1]) {
        return Err(ReqMeterError::InvalidBuckets(format!(
            "bounds must be strictly increasing ({} >= {})",
            w[0], w[1]
        )));
    }
    Ok(())
}
