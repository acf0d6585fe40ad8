//! reqmeter core: request instrumentation independent of any HTTP framework or
//! metrics backend.
//!
//! This crate defines the metric sink and request context contracts, the
//! [`MetricSet`] of request instruments, and the per-request [`Interceptor`].
//! It carries no transport or runtime dependencies so it can sit behind any
//! server that can call `on_start`/`on_finish` around its handlers.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Instrumentation must
//! never take a request down with it.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod interceptor;
pub mod labels;
pub mod metric_set;
pub mod sink;

pub use error::{ErrorKind, ReqMeterError, Result};
pub use interceptor::{
    resolve_status, ExposePath, HttpError, InFlight, Interceptor, InterceptorConfig,
    RequestContext, RequestState, StatusError,
};
pub use labels::ConstLabels;
pub use metric_set::{MetricSet, MetricSetBuilder, DEFAULT_BUCKETS};
pub use sink::{CounterHandle, Exposition, GaugeHandle, HistogramHandle, MetricDesc, MetricSink};
