//! reqmeter gateway library entry.
//!
//! This crate wires the core interceptor into axum/tower: the metrics layer,
//! the in-process and `prometheus` sinks, the exposition endpoint, config
//! loading, and the demo router. It is consumed by the binary (`main.rs`) and
//! by integration tests.

pub mod app_state;
pub mod config;
pub mod metrics;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
pub mod transport;

pub use metrics::HttpMetrics;
pub use transport::{MetricsLayer, MetricsService};
