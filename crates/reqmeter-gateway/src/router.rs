//! Axum router wiring.
//!
//! Demo routes, the metrics exposition endpoint, and the metrics layer over
//! all of them. `Router::layer` wraps each route after matching, so the layer
//! sees `MatchedPath`.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, services};

pub fn build_router(state: &AppState) -> Router {
    let metrics = state.metrics();
    let app = Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/users/:id", get(services::users::get_user))
        .route("/fail", get(services::users::fail));

    metrics.mount(app).layer(metrics.layer())
}
