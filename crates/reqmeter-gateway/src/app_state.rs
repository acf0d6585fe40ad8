//! Shared application state for the reqmeter gateway.
//!
//! This is the composition root: it picks the metrics backend named in the
//! config and builds the instrumented metric set on it. Startup errors
//! (registration conflicts, bad labels) come back as `Result`.

use std::sync::Arc;

use reqmeter_core::error::Result;

use crate::config::{Backend, GatewayConfig};
use crate::metrics::HttpMetrics;
use crate::obs::{InProcessRegistry, PrometheusSink};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    metrics: HttpMetrics,
}

impl AppState {
    /// Build application state on a fresh sink of the configured backend.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let metrics = match cfg.metrics.backend {
            Backend::InProcess => {
                let sink = Arc::new(InProcessRegistry::new());
                HttpMetrics::from_config_with_sink(sink, &cfg.metrics)?
            }
            Backend::Prometheus => {
                let sink = Arc::new(PrometheusSink::default());
                HttpMetrics::from_config_with_sink(sink, &cfg.metrics)?
            }
        };

        tracing::info!(
            backend = ?cfg.metrics.backend,
            expose_path = %metrics.expose_path(),
            skip_paths = cfg.metrics.skip_paths.len(),
            full_paths = cfg.metrics.full_paths,
            "request metrics ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, metrics }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.inner.metrics
    }
}
