//! Per-request hook: exclusion, label resolution, in-flight tracking.
//!
//! Hosts call [`Interceptor::on_start`] before dispatching to the handler and
//! [`Interceptor::on_finish`] with the handler outcome afterwards. The state
//! returned by `on_start` owns the in-flight increment; dropping it (including
//! when the host drops a cancelled request future) releases the increment
//! exactly once.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use thiserror::Error;

use crate::metric_set::MetricSet;
use crate::sink::GaugeHandle;

/// Status used when a handler fails without a structured status code.
pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// Path label for requests that matched no route (template mode only).
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// What the interceptor reads from a request.
pub trait RequestContext {
    /// Resolved HTTP method, e.g. `GET`.
    fn method(&self) -> &str;
    /// Route template, e.g. `/users/:id`. `None` when no route matched.
    fn route_path(&self) -> Option<&str>;
    /// Literal request path, e.g. `/users/42`.
    fn request_path(&self) -> &str;
}

/// Errors that may carry an HTTP status code.
pub trait StatusError {
    fn status_code(&self) -> Option<u16>;
}

impl StatusError for Infallible {
    fn status_code(&self) -> Option<u16> {
        match *self {}
    }
}

/// Structured handler error with an explicit status code.
#[derive(Debug, Clone, Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl StatusError for HttpError {
    fn status_code(&self) -> Option<u16> {
        Some(self.status)
    }
}

/// Boxed errors are structured only when they wrap an [`HttpError`].
impl StatusError for Box<dyn std::error::Error + Send + Sync> {
    fn status_code(&self) -> Option<u16> {
        self.downcast_ref::<HttpError>().map(|e| e.status)
    }
}

/// Status label of a finished request.
///
/// - structured error -> its code
/// - no error -> the response status
/// - unstructured error -> 500
pub fn resolve_status<E: StatusError + ?Sized>(outcome: Result<u16, &E>) -> u16 {
    match outcome {
        Ok(status) => status,
        Err(e) => e.status_code().unwrap_or(INTERNAL_SERVER_ERROR),
    }
}

/// One in-flight increment for a method; decrements on drop.
pub struct InFlight {
    gauge: Arc<dyn GaugeHandle>,
    method: String,
}

impl InFlight {
    fn acquire(gauge: Arc<dyn GaugeHandle>, method: &str) -> Self {
        gauge.inc(&[method]);
        Self {
            gauge,
            method: method.to_owned(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gauge.dec(&[self.method.as_str()]);
    }
}

/// Returned by [`Interceptor::on_start`], consumed by [`Interceptor::on_finish`].
pub enum RequestState {
    /// Expose path or skip path: nothing recorded.
    Excluded,
    Tracked { started: Instant, in_flight: InFlight },
}

impl RequestState {
    pub fn is_excluded(&self) -> bool {
        matches!(self, RequestState::Excluded)
    }
}

/// Exposition endpoint path, shared by every clone.
///
/// Interceptors read it per request, so moving the endpoint after a layer was
/// built still keeps it out of the metrics.
#[derive(Debug, Clone)]
pub struct ExposePath(Arc<RwLock<String>>);

impl ExposePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(path.into())))
    }

    pub fn get(&self) -> String {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, path: impl Into<String>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = path.into();
    }

    pub fn matches(&self, path: &str) -> bool {
        *self.0.read().unwrap_or_else(PoisonError::into_inner) == path
    }
}

impl Default for ExposePath {
    fn default() -> Self {
        Self::new("/metrics")
    }
}

impl From<&str> for ExposePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterceptorConfig {
    /// Path of the exposition endpoint, never instrumented.
    pub expose_path: ExposePath,
    /// Additional paths never instrumented.
    pub skip_paths: Vec<String>,
    /// Literal request path as the `path` label instead of the route template.
    /// Off by default: parameter values would create unbounded series.
    pub full_paths: bool,
}

/// Stateless apart from the shared [`MetricSet`]; build once, share via `Arc`.
pub struct Interceptor {
    metrics: Arc<MetricSet>,
    expose_path: ExposePath,
    skipped: HashSet<String>,
    full_paths: bool,
}

impl Interceptor {
    pub fn new(metrics: Arc<MetricSet>, cfg: InterceptorConfig) -> Self {
        Self {
            metrics,
            expose_path: cfg.expose_path,
            skipped: cfg.skip_paths.into_iter().collect(),
            full_paths: cfg.full_paths,
        }
    }

    /// Both the route template and the literal path are checked against the
    /// expose path and the skip paths.
    pub fn is_excluded<R: RequestContext + ?Sized>(&self, req: &R) -> bool {
        let hit = |p: &str| self.expose_path.matches(p) || self.skipped.contains(p);
        req.route_path().is_some_and(hit) || hit(req.request_path())
    }

    pub fn path_label<'a, R: RequestContext + ?Sized>(&self, req: &'a R) -> &'a str {
        if self.full_paths {
            req.request_path()
        } else {
            req.route_path().unwrap_or(UNMATCHED_ROUTE)
        }
    }

    pub fn on_start<R: RequestContext + ?Sized>(&self, req: &R) -> RequestState {
        let started = Instant::now();
        if self.is_excluded(req) {
            tracing::debug!(path = %req.request_path(), "request excluded from metrics");
            return RequestState::Excluded;
        }
        let in_flight = InFlight::acquire(self.metrics.in_flight_handle(), req.method());
        RequestState::Tracked { started, in_flight }
    }

    /// Record a finished request. `outcome` is the response status or the
    /// handler error; the caller returns its own result unchanged.
    pub fn on_finish<R, E>(&self, state: RequestState, req: &R, outcome: Result<u16, &E>)
    where
        R: RequestContext + ?Sized,
        E: StatusError + ?Sized,
    {
        let RequestState::Tracked { started, in_flight } = state else {
            return;
        };
        drop(in_flight);

        let status = resolve_status(outcome).to_string();
        let labels = [status.as_str(), req.method(), self.path_label(req)];

        self.metrics.requests_total().inc(&labels);
        self.metrics
            .request_duration()
            .observe(&labels, started.elapsed().as_secs_f64());
    }
}
