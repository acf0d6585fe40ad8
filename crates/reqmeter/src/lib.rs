//! Top-level facade crate for reqmeter.
//!
//! Re-exports the core interceptor and the axum gateway so users can depend on a single crate.

pub mod core {
    pub use reqmeter_core::*;
}

pub mod gateway {
    pub use reqmeter_gateway::*;
}

pub use reqmeter_core::{Interceptor, InterceptorConfig, MetricSet};
pub use reqmeter_gateway::{HttpMetrics, MetricsLayer};
