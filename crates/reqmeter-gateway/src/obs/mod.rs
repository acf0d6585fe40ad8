//! Metric sinks.
//!
//! `registry` is the dependency-free in-process backend, `prom` adapts the
//! `prometheus` crate. Both implement the core sink and exposition contracts.

pub mod prom;
pub mod registry;

use std::sync::Arc;

use once_cell::sync::Lazy;

pub use prom::PrometheusSink;
pub use registry::InProcessRegistry;

static DEFAULT_REGISTRY: Lazy<Arc<InProcessRegistry>> =
    Lazy::new(|| Arc::new(InProcessRegistry::new()));

/// Process-wide registry used by the convenience constructors of
/// [`crate::HttpMetrics`]. Library code takes its sink explicitly.
pub fn default_registry() -> Arc<InProcessRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}
