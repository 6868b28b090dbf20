//! HTTP routes for the Authorization Server.

use crate::handlers::{
    health, introspection_handler, jwks_handler, revocation_handler, token_handler, AppState,
};
use crate::middleware::{http_metrics_middleware, require_bearer_token};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Build the application routes.
///
/// - `/oauth2/token` - JWT bearer grant (public, client authenticated in-handler)
/// - `/oauth2/introspect` - Token introspection (bearer credential required)
/// - `/oauth2/revoke` - Token revocation (bearer credential required)
/// - `/.well-known/jwks.json` - Access token verification key
/// - `/health`, `/metrics` - Operational endpoints
/// - TraceLayer, HTTP metrics and a 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/oauth2/token", post(token_handler::handle_token))
        .route("/.well-known/jwks.json", get(jwks_handler::handle_get_jwks))
        .route("/health", get(health::health_check))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(health::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route(
            "/oauth2/introspect",
            post(introspection_handler::handle_introspect),
        )
        .route("/oauth2/revoke", post(revocation_handler::handle_revoke))
        .route_layer(middleware::from_fn(require_bearer_token))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TraceLayer (innermost)
    // 2. TimeoutLayer
    // 3. http_metrics_middleware (outermost, sees every response)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
