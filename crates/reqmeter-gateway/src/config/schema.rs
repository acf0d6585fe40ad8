use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::Deserialize;
use reqmeter_core::error::{ReqMeterError, Result};
use reqmeter_core::metric_set::validate_buckets;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl GatewayConfig {
    pub fn fill_defaults(&mut self) {
        self.metrics.fill_defaults();
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ReqMeterError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            ReqMeterError::Config(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

/// Which sink the metric set registers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    InProcess,
    Prometheus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_service")]
    pub service: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub subsystem: String,

    /// Extra constant labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default = "default_expose_path")]
    pub expose_path: String,

    #[serde(default)]
    pub skip_paths: Vec<String>,

    #[serde(default)]
    pub full_paths: bool,

    /// Histogram bucket override (seconds).
    #[serde(default)]
    pub buckets: Option<Vec<f64>>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            service: default_service(),
            namespace: default_namespace(),
            subsystem: String::new(),
            labels: BTreeMap::new(),
            expose_path: default_expose_path(),
            skip_paths: Vec::new(),
            full_paths: false,
            buckets: None,
        }
    }
}

impl MetricsSection {
    /// Empty `service` and `namespace` mean "unset".
    pub fn fill_defaults(&mut self) {
        if self.service.is_empty() {
            self.service = default_service();
        }
        if self.namespace.is_empty() {
            self.namespace = default_namespace();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(ReqMeterError::Config("metrics.namespace must not be empty".into()));
        }
        if !self.expose_path.starts_with('/') {
            return Err(ReqMeterError::Config(
                "metrics.expose_path must start with '/'".into(),
            ));
        }
        if let Some(p) = self.skip_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ReqMeterError::Config(format!(
                "metrics.skip_paths entry {p:?} must start with '/'"
            )));
        }
        if self.skip_paths.contains(&self.expose_path) {
            return Err(ReqMeterError::Config(
                "metrics.skip_paths must not repeat metrics.expose_path".into(),
            ));
        }
        if let Some(b) = &self.buckets {
            validate_buckets(b)
                .map_err(|e| ReqMeterError::Config(format!("metrics.buckets: {e}")))?;
        }
        Ok(())
    }
}

fn default_service() -> String {
    "my-service".into()
}
fn default_namespace() -> String {
    "http".into()
}
fn default_expose_path() -> String {
    "/metrics".into()
}
