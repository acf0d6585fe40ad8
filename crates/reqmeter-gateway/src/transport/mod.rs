//! Transport layer (HTTP).
//!
//! Exposes the tower middleware that wraps every routed request, and the
//! request snapshot it hands to the interceptor.

pub mod layer;
pub mod request;

pub use layer::{MetricsLayer, MetricsService};
pub use request::RequestInfo;
