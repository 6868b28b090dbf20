//! Observability for the authorization server.
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit safe field allow-listing.
//! Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (enums, outcomes, grant types)
//! - **HASHED**: Must be SHA-256 hashed for correlation (client_id, issuer)
//! - **NEVER**: Must never appear in logs (assertions, access tokens, secrets, subjects)

pub mod metrics;

use crate::errors::AsError;
use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Used for fields like `client_id` that need correlation across log entries
/// but should not be stored in plaintext. Not suitable for secrets.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Client or caller authentication failures
    Authentication,
    /// Grant, scope and ownership refusals
    Authorization,
    /// Assertion signature and claim failures
    Assertion,
    /// Malformed requests
    Request,
    /// Storage and crypto failures
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Assertion => "assertion",
            ErrorCategory::Request => "request",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&AsError> for ErrorCategory {
    fn from(err: &AsError) -> Self {
        match err {
            AsError::InvalidClient | AsError::CallerUnauthorized => ErrorCategory::Authentication,
            AsError::ClientUnauthorizedForGrant
            | AsError::ScopeNotGranted { .. }
            | AsError::TokenNotOwned => ErrorCategory::Authorization,
            AsError::SignatureInvalid
            | AsError::AssertionExpired
            | AsError::AssertionNotYetValid
            | AsError::InvalidAssertion(_) => ErrorCategory::Assertion,
            AsError::UnsupportedGrantType | AsError::InvalidRequest(_) => ErrorCategory::Request,
            AsError::Database(_) | AsError::Crypto(_) | AsError::Internal => {
                ErrorCategory::Internal
            }
        }
    }
}
