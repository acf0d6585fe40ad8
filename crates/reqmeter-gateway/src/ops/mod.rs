//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - metrics exposition, mounted by `HttpMetrics::register_at`

use std::sync::Arc;

use axum::{http::StatusCode, response::{IntoResponse, Response}};

use reqmeter_core::sink::Exposition;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(exposition: Arc<dyn Exposition>) -> Response {
    match exposition.render() {
        Ok(body) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, exposition.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "metrics render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}
