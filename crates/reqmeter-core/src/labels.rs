//! Label schema and constant labels.

use std::collections::BTreeMap;

use crate::error::{ReqMeterError, Result};

pub const STATUS_CODE: &str = "status_code";
pub const METHOD: &str = "method";
pub const PATH: &str = "path";

/// Per-request labels of the counter and the histogram, in handle order.
pub const REQUEST_LABELS: &[&str] = &[STATUS_CODE, METHOD, PATH];

/// Per-request labels of the in-flight gauge.
pub const IN_FLIGHT_LABELS: &[&str] = &[METHOD];

/// Label name of the service constant label.
pub const SERVICE: &str = "service";

/// Immutable name -> value mapping attached to every series of a metric set.
///
/// Only constructible through [`ConstLabelsBuilder`], so a value of this type
/// never carries a reserved or malformed name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstLabels(BTreeMap<String, String>);

impl ConstLabels {
    pub fn builder() -> ConstLabelsBuilder {
        ConstLabelsBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Collects the service label and caller-supplied pairs, validated once.
#[derive(Debug, Default)]
pub struct ConstLabelsBuilder {
    service: Option<String>,
    extra: Vec<(String, String)>,
}

impl ConstLabelsBuilder {
    /// Empty service names add no label.
    pub fn service(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.service = if name.is_empty() { None } else { Some(name) };
        self
    }

    pub fn label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    pub fn labels<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.extra
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Caller pairs are applied after the service label and win on equal keys.
    pub fn build(self) -> Result<ConstLabels> {
        let mut map = BTreeMap::new();
        if let Some(service) = self.service {
            map.insert(SERVICE.to_string(), service);
        }
        for (name, value) in self.extra {
            if REQUEST_LABELS.contains(&name.as_str()) {
                return Err(ReqMeterError::ReservedLabel(name));
            }
            if !is_valid_label_name(&name) {
                return Err(ReqMeterError::InvalidLabelName(name));
            }
            map.insert(name, value);
        }
        Ok(ConstLabels(map))
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, excluding the `__` prefix reserved by Prometheus.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') || name.starts_with("__") {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == ':') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
