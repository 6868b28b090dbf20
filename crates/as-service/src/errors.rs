use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsError {
    #[error("Assertion signature is invalid")]
    SignatureInvalid,

    #[error("Assertion has expired")]
    AssertionExpired,

    #[error("Assertion is not yet valid")]
    AssertionNotYetValid,

    #[error("Invalid assertion: {0}")]
    InvalidAssertion(String),

    #[error("Client is not authorized to use this grant type")]
    ClientUnauthorizedForGrant,

    #[error("Client authentication failed")]
    InvalidClient,

    #[error("Requested scope {requested:?} not granted, allowed {allowed:?}")]
    ScopeNotGranted {
        requested: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("Unsupported grant type")]
    UnsupportedGrantType,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Caller is not authorized")]
    CallerUnauthorized,

    #[error("Token was not issued to the requesting client")]
    TokenNotOwned,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Internal server error")]
    Internal,
}

impl AsError {
    /// Machine-readable kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            AsError::SignatureInvalid => "signature_invalid",
            AsError::AssertionExpired => "assertion_expired",
            AsError::AssertionNotYetValid => "assertion_not_yet_valid",
            AsError::InvalidAssertion(_) => "invalid_assertion",
            AsError::ClientUnauthorizedForGrant => "client_unauthorized_for_grant",
            AsError::InvalidClient => "invalid_client",
            AsError::ScopeNotGranted { .. } => "scope_not_granted",
            AsError::UnsupportedGrantType => "unsupported_grant_type",
            AsError::InvalidRequest(_) => "invalid_request",
            AsError::CallerUnauthorized => "caller_unauthorized",
            AsError::TokenNotOwned => "token_not_owned",
            AsError::Database(_) => "database_error",
            AsError::Crypto(_) => "crypto_error",
            AsError::Internal => "internal_error",
        }
    }

    /// RFC 6749 Section 5.2 error code.
    pub fn oauth_error(&self) -> &'static str {
        match self {
            AsError::SignatureInvalid
            | AsError::AssertionExpired
            | AsError::AssertionNotYetValid
            | AsError::InvalidAssertion(_) => "invalid_grant",
            AsError::ClientUnauthorizedForGrant | AsError::TokenNotOwned => "unauthorized_client",
            AsError::InvalidClient => "invalid_client",
            AsError::ScopeNotGranted { .. } => "invalid_scope",
            AsError::UnsupportedGrantType => "unsupported_grant_type",
            AsError::InvalidRequest(_) => "invalid_request",
            AsError::CallerUnauthorized => "invalid_token",
            AsError::Database(_) | AsError::Crypto(_) | AsError::Internal => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AsError::InvalidClient | AsError::CallerUnauthorized => StatusCode::UNAUTHORIZED,
            AsError::Database(_) | AsError::Crypto(_) | AsError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn description(&self) -> String {
        match self {
            // Internal causes are logged where they occur and never echoed.
            AsError::Database(_) => "An internal database error occurred".to_string(),
            AsError::Crypto(_) => "An internal cryptographic error occurred".to_string(),
            AsError::ScopeNotGranted { .. } => {
                "None of the requested scopes are allowed for this client".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    error_description: String,
    error_kind: &'static str,
}

impl IntoResponse for AsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.oauth_error(),
            error_description: self.description(),
            error_kind: self.kind(),
        };

        let mut response = (status, Json(body)).into_response();

        match &self {
            AsError::CallerUnauthorized => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer error=\"invalid_token\""),
                );
            }
            AsError::InvalidClient => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"oauth2\""),
                );
            }
            _ => {}
        }

        // RFC 6749 Section 5.1
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        response
    }
}
