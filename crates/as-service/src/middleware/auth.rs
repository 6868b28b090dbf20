//! Bearer credential extraction for the introspection and revocation
//! endpoints.
//!
//! The bearer token is one of the caller's own access tokens. It is only
//! extracted here; whether it is known and active is decided by the service
//! handling the request, against the token store.

use crate::errors::AsError;
use axum::{extract::Request, middleware::Next, response::IntoResponse};
use common::secret::{ExposeSecret, SecretString};
use tracing::instrument;

/// Caller's access token, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Extract the bearer token from an `Authorization` header value.
///
/// The scheme name is case-insensitive (RFC 7235 Section 2.1).
fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Require a bearer credential on the request.
///
/// # Response
///
/// - Returns 401 with `WWW-Authenticate: Bearer` if the header is missing or malformed
/// - Continues to the next handler with [`BearerToken`] in extensions otherwise
#[instrument(skip_all, name = "as.middleware.auth")]
pub async fn require_bearer_token(
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AsError> {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(parse_bearer)
        .map(|t| SecretString::from(t.to_string()))
        .ok_or_else(|| {
            tracing::debug!(target: "as.middleware.auth", "Missing or malformed bearer credential");
            AsError::CallerUnauthorized
        })?;

    req.extensions_mut().insert(BearerToken::new(token));

    Ok(next.run(req).await)
}
