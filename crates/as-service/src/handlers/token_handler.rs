use crate::errors::AsError;
use crate::models::{TokenResponse, BEARER_TOKEN_TYPE, JWT_BEARER_GRANT_TYPE};
use crate::observability::metrics::{record_error, record_token_issuance};
use crate::observability::ErrorCategory;
use crate::services::client_service::ClientCredentials;
use axum::{
    extract::State,
    http::{
        header::{CACHE_CONTROL, PRAGMA},
        HeaderMap, HeaderValue,
    },
    Form, Json,
};
use base64::{engine::general_purpose, Engine as _};
use common::scope::{join_scope, parse_scope};
use common::secret::{ExposeSecret, SecretString};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use super::AppState;

/// Token request body (`application/x-www-form-urlencoded`).
///
/// Every field is optional here so a missing parameter surfaces as an OAuth
/// `invalid_request` rather than a framework rejection.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub assertion: Option<SecretString>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<SecretString>,
}

/// Handle token request (RFC 7523 JWT bearer grant)
///
/// POST /oauth2/token
///
/// Client credentials are taken from HTTP Basic auth when present, otherwise
/// from the `client_id` / `client_secret` form fields.
#[instrument(skip_all, name = "as.token.issue", fields(grant_type, status))]
pub async fn handle_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Result<(HeaderMap, Json<TokenResponse>), AsError> {
    let start = Instant::now();
    let grant_type = request.grant_type.clone().unwrap_or_default();
    tracing::Span::current().record("grant_type", grant_type.as_str());

    let result = issue_token(&state, &headers, request).await;

    let status = if result.is_ok() { "success" } else { "error" };
    tracing::Span::current().record("status", status);
    record_token_issuance(&grant_type, status, start.elapsed());
    if let Err(e) = &result {
        record_error(
            "token",
            ErrorCategory::from(e).as_str(),
            e.status_code().as_u16(),
        );
    }

    let response = result?;
    Ok((no_store_headers(), Json(response)))
}

async fn issue_token(
    state: &AppState,
    headers: &HeaderMap,
    request: TokenRequest,
) -> Result<TokenResponse, AsError> {
    let grant_type = request
        .grant_type
        .as_deref()
        .ok_or_else(|| AsError::InvalidRequest("Missing grant_type".to_string()))?;
    if grant_type != JWT_BEARER_GRANT_TYPE {
        return Err(AsError::UnsupportedGrantType);
    }

    let assertion = request
        .assertion
        .as_ref()
        .ok_or_else(|| AsError::InvalidRequest("Missing assertion".to_string()))?;

    // The issuer is needed to find the client when authentication is skipped.
    let validated = state.validator.validate(assertion.expose_secret()).await?;

    let credentials = extract_client_credentials(headers, &request)?;
    let client = state
        .clients
        .authenticate(credentials.as_ref(), &validated.issuer)?;

    let requested_scope = parse_scope(request.scope.as_deref().unwrap_or_default());
    let issued = state
        .grant_issuer
        .issue(&validated, &requested_scope, &client)
        .await?;

    let expires_in = u64::try_from(state.grant_issuer.lifespan().num_seconds()).unwrap_or(0);

    Ok(TokenResponse {
        access_token: issued.access_token.expose_secret().to_string(),
        token_type: BEARER_TOKEN_TYPE.to_string(),
        expires_in,
        scope: join_scope(&issued.record.scopes),
    })
}

/// Extract client credentials from the Basic auth header or the request body.
///
/// Returns `None` when the request carries no client identification at all.
fn extract_client_credentials(
    headers: &HeaderMap,
    request: &TokenRequest,
) -> Result<Option<ClientCredentials>, AsError> {
    if let Some(auth_header) = headers.get("authorization") {
        let auth_str = auth_header.to_str().map_err(|_| AsError::InvalidClient)?;

        let basic_auth = auth_str
            .trim()
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"))
            .map(|(_, value)| value);

        if let Some(basic_auth) = basic_auth {
            let decoded = general_purpose::STANDARD
                .decode(basic_auth.trim())
                .map_err(|_| AsError::InvalidClient)?;
            let credentials = String::from_utf8(decoded).map_err(|_| AsError::InvalidClient)?;

            return match credentials.split_once(':') {
                Some((client_id, secret)) => {
                    let client_id = form_urldecode(client_id)?;
                    let secret = form_urldecode(secret)?;
                    if client_id.is_empty() {
                        return Err(AsError::InvalidClient);
                    }
                    Ok(Some(ClientCredentials {
                        client_id,
                        client_secret: (!secret.is_empty()).then(|| SecretString::from(secret)),
                    }))
                }
                None => Err(AsError::InvalidClient),
            };
        }
    }

    match &request.client_id {
        Some(client_id) if !client_id.is_empty() => Ok(Some(ClientCredentials {
            client_id: client_id.clone(),
            client_secret: request.client_secret.clone(),
        })),
        _ if request.client_secret.is_some() => Err(AsError::InvalidRequest(
            "client_secret supplied without client_id".to_string(),
        )),
        _ => Ok(None),
    }
}

/// Undo the `application/x-www-form-urlencoded` encoding applied to Basic
/// credentials.
fn form_urldecode(value: &str) -> Result<String, AsError> {
    let value = value.replace('+', " ");
    percent_decode_str(&value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| AsError::InvalidClient)
}

/// Token responses must not be cached (RFC 6749 Section 5.1).
pub(crate) fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}
