use crate::models::Jwks;
use crate::observability::metrics::record_jwks_request;
use crate::services::key_management_service;
use axum::{
    extract::State,
    http::header::{HeaderMap, HeaderValue, CACHE_CONTROL},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::AppState;

/// Handle JWKS request
///
/// GET /.well-known/jwks.json
///
/// Publishes the public half of the access token signing key (RFC 7517) so
/// resource servers can verify tokens offline. Cacheable for one hour.
#[instrument(name = "as.jwks.get", skip_all)]
pub async fn handle_get_jwks(State(state): State<Arc<AppState>>) -> (HeaderMap, Json<Jwks>) {
    record_jwks_request();

    let jwks = key_management_service::get_jwks(&state.signing_key);

    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=3600"));

    (headers, Json(jwks))
}
