//! Recording sink and request fixtures shared by core tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use reqmeter_core::error::{ReqMeterError, Result};
use reqmeter_core::sink::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricDesc, MetricSink,
};
use reqmeter_core::RequestContext;

fn key(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Default)]
pub struct Counter {
    values: Mutex<HashMap<Vec<String>, u64>>,
}

impl Counter {
    pub fn get(&self, values: &[&str]) -> u64 {
        self.values.lock().unwrap().get(&key(values)).copied().unwrap_or(0)
    }
    pub fn series(&self) -> usize {
        self.values.lock().unwrap().len()
    }
    pub fn total(&self) -> u64 {
        self.values.lock().unwrap().values().sum()
    }
}

impl CounterHandle for Counter {
    fn inc(&self, values: &[&str]) {
        *self.values.lock().unwrap().entry(key(values)).or_default() += 1;
    }
}

#[derive(Default)]
pub struct Histogram {
    observations: Mutex<HashMap<Vec<String>, Vec<f64>>>,
}

impl Histogram {
    pub fn observations(&self, values: &[&str]) -> Vec<f64> {
        self.observations
            .lock()
            .unwrap()
            .get(&key(values))
            .cloned()
            .unwrap_or_default()
    }
    pub fn total(&self) -> usize {
        self.observations.lock().unwrap().values().map(Vec::len).sum()
    }
}

impl HistogramHandle for Histogram {
    fn observe(&self, values: &[&str], v: f64) {
        self.observations
            .lock()
            .unwrap()
            .entry(key(values))
            .or_default()
            .push(v);
    }
}

#[derive(Default)]
pub struct Gauge {
    values: Mutex<HashMap<Vec<String>, i64>>,
    lowest: Mutex<i64>,
    touched: Mutex<u64>,
}

impl Gauge {
    pub fn get(&self, values: &[&str]) -> i64 {
        self.values.lock().unwrap().get(&key(values)).copied().unwrap_or(0)
    }
    /// Lowest value any series ever reached.
    pub fn lowest(&self) -> i64 {
        *self.lowest.lock().unwrap()
    }
    /// Number of inc/dec calls.
    pub fn touched(&self) -> u64 {
        *self.touched.lock().unwrap()
    }

    fn add(&self, values: &[&str], delta: i64) {
        let mut map = self.values.lock().unwrap();
        let v = map.entry(key(values)).or_default();
        *v += delta;
        let mut lowest = self.lowest.lock().unwrap();
        *lowest = (*lowest).min(*v);
        *self.touched.lock().unwrap() += 1;
    }
}

impl GaugeHandle for Gauge {
    fn inc(&self, values: &[&str]) {
        self.add(values, 1);
    }
    fn dec(&self, values: &[&str]) {
        self.add(values, -1);
    }
}

/// Hands out the same three instruments for every registration and remembers
/// what was registered.
#[derive(Default)]
pub struct RecordingSink {
    pub counter: Arc<Counter>,
    pub histogram: Arc<Histogram>,
    pub gauge: Arc<Gauge>,
    pub descs: Mutex<Vec<MetricDesc>>,
    pub buckets: Mutex<Vec<f64>>,
    names: Mutex<HashSet<String>>,
}

impl RecordingSink {
    fn claim(&self, desc: &MetricDesc) -> Result<()> {
        if !self.names.lock().unwrap().insert(desc.name.clone()) {
            return Err(ReqMeterError::AlreadyRegistered(desc.name.clone()));
        }
        self.descs.lock().unwrap().push(desc.clone());
        Ok(())
    }

    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.lock().unwrap().iter().cloned().collect();
        names.sort();
        names
    }

    pub fn desc(&self, name: &str) -> MetricDesc {
        self.descs
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("metric {name} not registered"))
    }
}

impl MetricSink for RecordingSink {
    fn register_counter(&self, desc: MetricDesc) -> Result<Arc<dyn CounterHandle>> {
        self.claim(&desc)?;
        Ok(self.counter.clone())
    }

    fn register_histogram(
        &self,
        desc: MetricDesc,
        buckets: &[f64],
    ) -> Result<Arc<dyn HistogramHandle>> {
        self.claim(&desc)?;
        *self.buckets.lock().unwrap() = buckets.to_vec();
        Ok(self.histogram.clone())
    }

    fn register_gauge(&self, desc: MetricDesc) -> Result<Arc<dyn GaugeHandle>> {
        self.claim(&desc)?;
        Ok(self.gauge.clone())
    }

    fn unregister(&self, desc: &MetricDesc) -> Result<()> {
        self.names.lock().unwrap().remove(&desc.name);
        self.descs.lock().unwrap().retain(|d| d.name != desc.name);
        Ok(())
    }
}

pub struct Req {
    pub method: &'static str,
    pub route: Option<&'static str>,
    pub path: &'static str,
}

impl Req {
    pub fn get(route: &'static str, path: &'static str) -> Self {
        Self {
            method: "GET",
            route: Some(route),
            path,
        }
    }
}

impl RequestContext for Req {
    fn method(&self) -> &str {
        self.method
    }
    fn route_path(&self) -> Option<&str> {
        self.route
    }
    fn request_path(&self) -> &str {
        self.path
    }
}
