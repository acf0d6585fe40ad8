//! reqmeter gateway
//!
//! Serves the demo routes with request metrics:
//! - `{namespace}_requests_total`, `_request_duration_seconds`,
//!   `_requests_in_progress_total`
//! - exposition at `metrics.expose_path` (default `/metrics`)
//!
//! Config path: first CLI argument, default `reqmeter.yaml`.

use tracing_subscriber::{fmt, EnvFilter};

use reqmeter_gateway::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, kind = e.kind().as_str(), "reqmeter-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> reqmeter_core::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "reqmeter.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let state = app_state::AppState::new(cfg)?;
    let listen = state.cfg().server.listen_addr()?;
    let app = router::build_router(&state);

    tracing::info!(%listen, "reqmeter-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| reqmeter_core::ReqMeterError::Internal(format!("bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| reqmeter_core::ReqMeterError::Internal(format!("server failed: {e}")))
}
