//! `HttpMetrics`: metric set + interceptor config + scrape source in one value.
//!
//! The short constructors register on the process-wide default registry; use
//! [`HttpMetrics::with_registry`] (or `from_config_with_sink`) to pick the sink
//! explicitly.
//!
//! ```ignore
//! let metrics = HttpMetrics::with_namespace("orders", "my_app", "http")?;
//! let app = Router::new().route("/orders/:id", get(order));
//! let app = metrics.register_at(app, "/metrics");
//! // my_app_http_requests_total{service="orders",...}
//! ```

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use reqmeter_core::error::Result;
use reqmeter_core::metric_set::{MetricSetBuilder, DEFAULT_NAMESPACE};
use reqmeter_core::sink::{Exposition, MetricSink};
use reqmeter_core::{ExposePath, Interceptor, InterceptorConfig, MetricSet};

use crate::config::schema::{Backend, MetricsSection};
use crate::obs::{self, PrometheusSink};
use crate::ops;
use crate::transport::MetricsLayer;

pub struct HttpMetrics {
    set: Arc<MetricSet>,
    exposition: Arc<dyn Exposition>,
    cfg: InterceptorConfig,
}

impl HttpMetrics {
    /// `service` becomes the `service` constant label.
    pub fn new(service: &str) -> Result<Self> {
        Self::with_namespace(service, DEFAULT_NAMESPACE, "")
    }

    /// Metrics are named `{namespace}_{subsystem}_...`.
    pub fn with_namespace(service: &str, namespace: &str, subsystem: &str) -> Result<Self> {
        Self::with_registry(
            obs::default_registry(),
            service,
            namespace,
            subsystem,
            Vec::<(String, String)>::new(),
        )
    }

    /// Constant labels only, no `service` label.
    pub fn with_labels<I, K, V>(labels: I, namespace: &str, subsystem: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_registry(obs::default_registry(), "", namespace, subsystem, labels)
    }

    pub fn with_registry<B, I, K, V>(
        sink: Arc<B>,
        service: &str,
        namespace: &str,
        subsystem: &str,
        labels: I,
    ) -> Result<Self>
    where
        B: MetricSink + Exposition + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let builder = MetricSet::builder()
            .service(service)
            .namespace(namespace)
            .subsystem(subsystem)
            .labels(labels);
        Self::assemble(sink, builder, InterceptorConfig::default())
    }

    /// Config-driven construction on the process-wide sink of the chosen
    /// backend.
    pub fn from_config(section: &MetricsSection) -> Result<Self> {
        match section.backend {
            Backend::InProcess => Self::from_config_with_sink(obs::default_registry(), section),
            Backend::Prometheus => Self::from_config_with_sink(
                Arc::new(PrometheusSink::new(prometheus::default_registry().clone())),
                section,
            ),
        }
    }

    pub fn from_config_with_sink<B>(sink: Arc<B>, section: &MetricsSection) -> Result<Self>
    where
        B: MetricSink + Exposition + 'static,
    {
        let mut builder = MetricSet::builder()
            .service(section.service.as_str())
            .namespace(section.namespace.as_str())
            .subsystem(section.subsystem.as_str())
            .labels(section.labels.clone());
        if let Some(buckets) = &section.buckets {
            builder = builder.buckets(buckets.clone());
        }
        let cfg = InterceptorConfig {
            expose_path: ExposePath::new(section.expose_path.as_str()),
            skip_paths: section.skip_paths.clone(),
            full_paths: section.full_paths,
        };
        Self::assemble(sink, builder, cfg)
    }

    fn assemble<B>(sink: Arc<B>, builder: MetricSetBuilder, cfg: InterceptorConfig) -> Result<Self>
    where
        B: MetricSink + Exposition + 'static,
    {
        let set = builder.build(sink.as_ref())?;
        Ok(Self {
            set: Arc::new(set),
            exposition: sink,
            cfg,
        })
    }

    pub fn skip_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.cfg.skip_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn full_paths(mut self, full: bool) -> Self {
        self.cfg.full_paths = full;
        self
    }

    pub fn expose_path(&self) -> String {
        self.cfg.expose_path.get()
    }

    pub fn metric_set(&self) -> &MetricSet {
        &self.set
    }

    pub fn exposition(&self) -> Arc<dyn Exposition> {
        Arc::clone(&self.exposition)
    }

    /// Mount the exposition handler at `path`, make it the expose path and
    /// layer the interceptor over `router`.
    ///
    /// Routes added to the returned router afterwards are not instrumented.
    /// Layers from [`HttpMetrics::layer`], built before or after, exclude the
    /// new path too.
    pub fn register_at<S>(&self, router: Router<S>, path: &str) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.cfg.expose_path.set(path);
        self.mount(router).layer(self.layer())
    }

    /// Mount the exposition handler at the configured expose path.
    pub fn mount<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let exposition = self.exposition();
        router.route(
            &self.cfg.expose_path.get(),
            get(move || ops::metrics(Arc::clone(&exposition))),
        )
    }

    /// Tower layer recording every request routed through it.
    pub fn layer(&self) -> MetricsLayer {
        MetricsLayer::new(Arc::new(Interceptor::new(
            Arc::clone(&self.set),
            self.cfg.clone(),
        )))
    }
}
