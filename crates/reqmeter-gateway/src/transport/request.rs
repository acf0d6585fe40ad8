//! Request metadata captured before dispatch.

use axum::extract::MatchedPath;
use axum::http::Request;

use reqmeter_core::RequestContext;

/// Owned snapshot of what the interceptor reads; the request itself moves
/// into the inner service.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: String,
    /// Route template from axum's `MatchedPath`, if routing matched.
    pub route: Option<String>,
    pub path: String,
}

impl RequestInfo {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().as_str().to_owned(),
            route: req
                .extensions()
                .get::<MatchedPath>()
                .map(|m| m.as_str().to_owned()),
            path: req.uri().path().to_owned(),
        }
    }
}

impl RequestContext for RequestInfo {
    fn method(&self) -> &str {
        &self.method
    }

    fn route_path(&self) -> Option<&str> {
        self.route.as_deref()
    }

    fn request_path(&self) -> &str {
        &self.path
    }
}
