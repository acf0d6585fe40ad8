//! Tower middleware around any HTTP service.
//!
//! Works for axum routers (`Error = Infallible`) as well as fallible services
//! whose error type implements `StatusError`. The inner result is returned
//! untouched; if the response future is dropped before completion, the
//! request state's drop releases the in-flight increment.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use reqmeter_core::{Interceptor, StatusError};

use super::request::RequestInfo;

#[derive(Clone)]
pub struct MetricsLayer {
    interceptor: Arc<Interceptor>,
}

impl MetricsLayer {
    pub fn new(interceptor: Arc<Interceptor>) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            interceptor: Arc::clone(&self.interceptor),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    interceptor: Arc<Interceptor>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: StatusError + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let info = RequestInfo::from_request(&req);
        let interceptor = Arc::clone(&self.interceptor);
        let state = interceptor.on_start(&info);
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;
            interceptor.on_finish(
                state,
                &info,
                result.as_ref().map(|res| res.status().as_u16()),
            );
            result
        })
    }
}
