//! In-process metrics registry.
//!
//! Counter/gauge/histogram families with positional label values backed by
//! `DashMap`, rendered in the Prometheus text exposition format. Each family
//! keeps its registration schema so duplicate or conflicting registrations are
//! rejected instead of merged.

use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use reqmeter_core::error::{ReqMeterError, Result};
use reqmeter_core::labels::ConstLabels;
use reqmeter_core::sink::{
    CounterHandle, Exposition, GaugeHandle, HistogramHandle, MetricDesc, MetricSink,
};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

#[derive(Debug, Clone, PartialEq)]
struct Schema {
    kind: &'static str,
    help: &'static str,
    const_labels: ConstLabels,
    label_names: &'static [&'static str],
    buckets: Vec<f64>,
}

impl Schema {
    fn new(kind: &'static str, desc: &MetricDesc, buckets: &[f64]) -> Self {
        Self {
            kind,
            help: desc.help,
            const_labels: desc.const_labels.clone(),
            label_names: desc.label_names,
            buckets: buckets.to_vec(),
        }
    }

    /// Const labels first, then the dynamic ones in schema order.
    fn label_str(&self, values: &[String]) -> String {
        self.const_labels
            .iter()
            .chain(self.label_names.iter().copied().zip(values.iter().map(String::as_str)))
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Series key, or `None` (logged) on an arity mismatch.
    fn key(&self, name: &str, values: &[&str]) -> Option<Vec<String>> {
        if values.len() != self.label_names.len() {
            tracing::warn!(
                metric = %name,
                expected = self.label_names.len(),
                got = values.len(),
                "label arity mismatch, observation dropped"
            );
            return None;
        }
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    fn header(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(self.help));
        let _ = writeln!(out, "# TYPE {} {}", name, self.kind);
    }
}

pub struct CounterVec {
    name: String,
    schema: Schema,
    map: DashMap<Vec<String>, AtomicU64>,
}

impl CounterVec {
    /// Increment by an arbitrary value.
    pub fn add(&self, values: &[&str], v: u64) {
        let Some(key) = self.schema.key(&self.name, values) else {
            return;
        };
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    fn get(&self, values: &[&str]) -> Option<u64> {
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.map.get(&key).map(|c| c.load(Ordering::Relaxed))
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, out: &mut String) {
        self.schema.header(&self.name, out);
        for r in self.map.iter() {
            let labels = self.schema.label_str(r.key());
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", self.name, labels, val);
        }
    }
}

impl CounterHandle for CounterVec {
    fn inc(&self, values: &[&str]) {
        self.add(values, 1);
    }
}

pub struct GaugeVec {
    name: String,
    schema: Schema,
    map: DashMap<Vec<String>, AtomicI64>,
}

impl GaugeVec {
    /// Add an arbitrary signed delta.
    pub fn add(&self, values: &[&str], v: i64) {
        let Some(key) = self.schema.key(&self.name, values) else {
            return;
        };
        let gauge = self.map.entry(key).or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    fn get(&self, values: &[&str]) -> Option<i64> {
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.map.get(&key).map(|g| g.load(Ordering::Relaxed))
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, out: &mut String) {
        self.schema.header(&self.name, out);
        for r in self.map.iter() {
            let labels = self.schema.label_str(r.key());
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", self.name, labels, val);
        }
    }
}

impl GaugeHandle for GaugeVec {
    fn inc(&self, values: &[&str]) {
        self.add(values, 1);
    }
    fn dec(&self, values: &[&str]) {
        self.add(values, -1);
    }
}

struct AtomicHistogram {
    count: AtomicU64,
    /// f64 bits.
    sum: AtomicU64,
    /// Cumulative: bucket `i` counts observations `<= bounds[i]`.
    buckets: Vec<AtomicU64>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0f64.to_bits()),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }
}

pub struct HistogramVec {
    name: String,
    schema: Schema,
    map: DashMap<Vec<String>, AtomicHistogram>,
}

impl HistogramVec {
    fn get(&self, values: &[&str]) -> Option<(u64, f64)> {
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.map
            .get(&key)
            .map(|h| (h.count.load(Ordering::Relaxed), h.sum()))
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    fn render(&self, out: &mut String) {
        self.schema.header(&self.name, out);
        for r in self.map.iter() {
            let hist = r.value();
            let label_str = self.schema.label_str(r.key());
            let prefix = if label_str.is_empty() {
                String::new()
            } else {
                format!("{},", label_str)
            };

            for (i, le) in self.schema.buckets.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", self.name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", self.name, prefix, count);
            let _ = writeln!(out, "{}_sum{{{}}} {}", self.name, label_str, hist.sum());
            let _ = writeln!(out, "{}_count{{{}}} {}", self.name, label_str, count);
        }
    }
}

impl HistogramHandle for HistogramVec {
    fn observe(&self, values: &[&str], v: f64) {
        let Some(key) = self.schema.key(&self.name, values) else {
            return;
        };
        let bounds = &self.schema.buckets;
        let hist = self
            .map
            .entry(key)
            .or_insert_with(|| AtomicHistogram::new(bounds.len()));

        hist.count.fetch_add(1, Ordering::Relaxed);
        let _ = hist
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + v).to_bits())
            });

        for (i, &b) in bounds.iter().enumerate() {
            if v <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

enum Family {
    Counter(Arc<CounterVec>),
    Gauge(Arc<GaugeVec>),
    Histogram(Arc<HistogramVec>),
}

impl Family {
    fn schema(&self) -> &Schema {
        match self {
            Family::Counter(c) => &c.schema,
            Family::Gauge(g) => &g.schema,
            Family::Histogram(h) => &h.schema,
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            Family::Counter(c) => c.render(out),
            Family::Gauge(g) => g.render(out),
            Family::Histogram(h) => h.render(out),
        }
    }
}

/// Dependency-free metrics backend; one instance per scrape endpoint.
#[derive(Default)]
pub struct InProcessRegistry {
    families: DashMap<String, Family>,
}

impl InProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(
        &self,
        name: String,
        schema: Schema,
        make: impl FnOnce(String, Schema) -> Family,
    ) -> Result<()> {
        match self.families.entry(name) {
            Entry::Occupied(e) => {
                if *e.get().schema() == schema {
                    Err(ReqMeterError::AlreadyRegistered(e.key().clone()))
                } else {
                    Err(ReqMeterError::SchemaMismatch(e.key().clone()))
                }
            }
            Entry::Vacant(v) => {
                let family = make(v.key().clone(), schema);
                v.insert(family);
                Ok(())
            }
        }
    }

    pub fn counter_value(&self, name: &str, values: &[&str]) -> Option<u64> {
        match self.families.get(name)?.value() {
            Family::Counter(c) => c.get(values),
            _ => None,
        }
    }

    pub fn gauge_value(&self, name: &str, values: &[&str]) -> Option<i64> {
        match self.families.get(name)?.value() {
            Family::Gauge(g) => g.get(values),
            _ => None,
        }
    }

    /// Observation count of one histogram series.
    pub fn histogram_count(&self, name: &str, values: &[&str]) -> Option<u64> {
        match self.families.get(name)?.value() {
            Family::Histogram(h) => h.get(values).map(|(count, _)| count),
            _ => None,
        }
    }

    pub fn histogram_sum(&self, name: &str, values: &[&str]) -> Option<f64> {
        match self.families.get(name)?.value() {
            Family::Histogram(h) => h.get(values).map(|(_, sum)| sum),
            _ => None,
        }
    }

    /// Render all registered metrics, sorted by name.
    pub fn render_text(&self) -> String {
        let mut names: Vec<String> = self.families.iter().map(|r| r.key().clone()).collect();
        names.sort();

        let mut out = String::new();
        for name in names {
            if let Some(family) = self.families.get(&name) {
                family.render(&mut out);
            }
        }
        out
    }
}

impl MetricSink for InProcessRegistry {
    fn register_counter(&self, desc: MetricDesc) -> Result<Arc<dyn CounterHandle>> {
        let mut handle = None;
        let schema = Schema::new("counter", &desc, &[]);
        self.claim(desc.name.clone(), schema, |name, schema| {
            let c = Arc::new(CounterVec {
                name,
                schema,
                map: DashMap::new(),
            });
            handle = Some(Arc::clone(&c));
            Family::Counter(c)
        })?;
        handle
            .map(|c| c as Arc<dyn CounterHandle>)
            .ok_or_else(|| ReqMeterError::Internal("counter not created".into()))
    }

    fn register_histogram(
        &self,
        desc: MetricDesc,
        buckets: &[f64],
    ) -> Result<Arc<dyn HistogramHandle>> {
        let mut handle = None;
        let schema = Schema::new("histogram", &desc, buckets);
        self.claim(desc.name.clone(), schema, |name, schema| {
            let h = Arc::new(HistogramVec {
                name,
                schema,
                map: DashMap::new(),
            });
            handle = Some(Arc::clone(&h));
            Family::Histogram(h)
        })?;
        handle
            .map(|h| h as Arc<dyn HistogramHandle>)
            .ok_or_else(|| ReqMeterError::Internal("histogram not created".into()))
    }

    fn register_gauge(&self, desc: MetricDesc) -> Result<Arc<dyn GaugeHandle>> {
        let mut handle = None;
        let schema = Schema::new("gauge", &desc, &[]);
        self.claim(desc.name.clone(), schema, |name, schema| {
            let g = Arc::new(GaugeVec {
                name,
                schema,
                map: DashMap::new(),
            });
            handle = Some(Arc::clone(&g));
            Family::Gauge(g)
        })?;
        handle
            .map(|g| g as Arc<dyn GaugeHandle>)
            .ok_or_else(|| ReqMeterError::Internal("gauge not created".into()))
    }

    fn unregister(&self, desc: &MetricDesc) -> Result<()> {
        let removed = self.families.remove_if(&desc.name, |_, family| {
            let schema = family.schema();
            schema.const_labels == desc.const_labels && schema.label_names == desc.label_names
        });
        match removed {
            Some(_) => Ok(()),
            None => Err(ReqMeterError::Sink(format!("{} is not registered", desc.name))),
        }
    }
}

impl Exposition for InProcessRegistry {
    fn render(&self) -> Result<String> {
        Ok(self.render_text())
    }
}
