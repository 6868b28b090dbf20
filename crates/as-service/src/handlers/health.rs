//! Operational endpoints.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/metrics`: Prometheus scrape endpoint

use axum::extract::State;
use metrics_exporter_prometheus::PrometheusHandle;

/// Liveness probe handler.
///
/// Does not touch the token store: failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Render every recorded metric in Prometheus text format.
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
