use crate::errors::AsError;
use crate::middleware::auth::BearerToken;
use crate::models::IntrospectionResponse;
use crate::observability::metrics::record_error;
use crate::observability::ErrorCategory;
use axum::{
    extract::State,
    http::HeaderMap,
    Extension, Form, Json,
};
use common::scope::parse_scope;
use common::secret::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;

use super::token_handler::no_store_headers;
use super::AppState;

/// Introspection request body (RFC 7662 Section 2.1).
#[derive(Debug, Deserialize)]
pub struct IntrospectionRequest {
    #[serde(default)]
    pub token: Option<SecretString>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Accepted and ignored: only access tokens are issued here.
    #[serde(default)]
    pub token_type_hint: Option<String>,
}

/// Handle introspection request
///
/// POST /oauth2/introspect
///
/// The caller authenticates with one of its own access tokens as a bearer
/// credential. Tokens that are unknown, expired, revoked or outside the
/// requested scope are reported as `{"active":false}`.
pub async fn handle_introspect(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<BearerToken>,
    Form(request): Form<IntrospectionRequest>,
) -> Result<(HeaderMap, Json<IntrospectionResponse>), AsError> {
    let result = introspect(&state, &caller, &request).await;

    if let Err(e) = &result {
        record_error(
            "introspect",
            ErrorCategory::from(e).as_str(),
            e.status_code().as_u16(),
        );
    }

    let response = result?;
    Ok((no_store_headers(), Json(response)))
}

async fn introspect(
    state: &AppState,
    caller: &BearerToken,
    request: &IntrospectionRequest,
) -> Result<IntrospectionResponse, AsError> {
    let target = request
        .token
        .as_ref()
        .filter(|t| !t.expose_secret().is_empty())
        .ok_or_else(|| AsError::InvalidRequest("Missing token".to_string()))?;

    let requested_scope = parse_scope(request.scope.as_deref().unwrap_or_default());

    let result = state
        .introspection
        .introspect(
            caller.expose(),
            target.expose_secret(),
            &requested_scope,
        )
        .await?;

    Ok(IntrospectionResponse::from_result(
        result,
        &state.config.issuer,
    ))
}
