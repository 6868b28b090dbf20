use crate::errors::AsError;
use crate::middleware::auth::BearerToken;
use crate::observability::metrics::record_error;
use crate::observability::ErrorCategory;
use axum::{extract::State, http::HeaderMap, Extension, Form};
use common::secret::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;

use super::token_handler::no_store_headers;
use super::AppState;

/// Revocation request body (RFC 7009 Section 2.1).
#[derive(Debug, Deserialize)]
pub struct RevocationRequest {
    #[serde(default)]
    pub token: Option<SecretString>,
    #[serde(default)]
    pub token_type_hint: Option<String>,
}

/// Handle revocation request
///
/// POST /oauth2/revoke
///
/// Responds 200 with an empty body whether or not the token was known.
pub async fn handle_revoke(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<BearerToken>,
    Form(request): Form<RevocationRequest>,
) -> Result<HeaderMap, AsError> {
    let result = match request
        .token
        .as_ref()
        .filter(|t| !t.expose_secret().is_empty())
    {
        Some(target) => state
            .revocation
            .revoke(caller.expose(), target.expose_secret())
            .await
            .map(|_| ()),
        None => Err(AsError::InvalidRequest("Missing token".to_string())),
    };

    if let Err(e) = &result {
        record_error(
            "revoke",
            ErrorCategory::from(e).as_str(),
            e.status_code().as_u16(),
        );
    }

    result?;
    Ok(no_store_headers())
}
