//! JWT bearer assertion validation (RFC 7523 Section 3).
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. Size and structure, then `kid` and unverified `iss` for key lookup
//! 2. Key resolution and signature (`SignatureInvalid`)
//! 3. Presence of `iss`, `sub`, `exp`, `aud`
//! 4. `exp` in the future (`AssertionExpired`) and within the maximum lifetime
//! 5. `iat`, when present, not in the future (`AssertionNotYetValid`)
//! 6. `aud` contains the token endpoint URL
//! 7. `iat` / `jti` presence when configured as mandatory
//!
//! Validation only reads the key registry; replay tracking of `jti` happens
//! at issuance.

use crate::config::Config;
use crate::crypto;
use crate::errors::AsError;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_assertion_validation;
use crate::repositories::KeyRegistry;
use chrono::{DateTime, Duration, Utc};
use common::jwt::{self, AudienceClaim, JwtValidationError};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Server-side acceptance rules for assertions.
#[derive(Debug, Clone)]
pub struct AssertionPolicy {
    /// Must appear in every assertion's `aud`.
    pub token_url: String,
    /// Longest accepted distance between now and `exp`.
    pub max_lifetime: Duration,
    /// Tolerance for `iat` ahead of the server clock.
    pub clock_skew: std::time::Duration,
    pub require_issued_at: bool,
    pub require_token_id: bool,
}

impl AssertionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            token_url: config.token_url.clone(),
            max_lifetime: Duration::seconds(config.assertion_max_lifetime_seconds),
            clock_skew: config.jwt_clock_skew(),
            require_issued_at: config.require_assertion_iat,
            require_token_id: config.require_assertion_jti,
        }
    }
}

/// An assertion whose signature and claims have been verified.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedAssertion {
    pub issuer: String,
    pub subject: String,
    pub audience: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub token_id: Option<String>,
    pub key_id: String,
}

impl fmt::Debug for ValidatedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedAssertion")
            .field("issuer", &self.issuer)
            .field("subject", &"[REDACTED]")
            .field("audience", &self.audience)
            .field("expires_at", &self.expires_at)
            .field("issued_at", &self.issued_at)
            .field("token_id", &self.token_id)
            .field("key_id", &self.key_id)
            .finish()
    }
}

pub struct AssertionValidator {
    registry: Arc<dyn KeyRegistry>,
    policy: AssertionPolicy,
}

impl AssertionValidator {
    pub fn new(registry: Arc<dyn KeyRegistry>, policy: AssertionPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> &AssertionPolicy {
        &self.policy
    }

    #[instrument(skip_all, name = "as.assertion.validate", fields(status))]
    pub async fn validate(&self, assertion: &str) -> Result<ValidatedAssertion, AsError> {
        let result = self.validate_at(assertion, Utc::now()).await;

        match &result {
            Ok(_) => {
                tracing::Span::current().record("status", "success");
                record_assertion_validation("success", None);
            }
            Err(e) => {
                tracing::Span::current().record("status", "error");
                record_assertion_validation("error", Some(e.kind()));
            }
        }

        result
    }

    /// Validate against an explicit clock.
    pub async fn validate_at(
        &self,
        assertion: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidatedAssertion, AsError> {
        let key_id = jwt::extract_kid(assertion).map_err(map_pre_verification_error)?;
        let unverified_issuer =
            jwt::extract_unverified_issuer(assertion).map_err(map_pre_verification_error)?;

        let public_key = self
            .registry
            .resolve(&unverified_issuer, &key_id)
            .await?
            .ok_or_else(|| {
                tracing::debug!(
                    target: "as.assertion",
                    issuer = %hash_for_correlation(&unverified_issuer),
                    key_id = %key_id,
                    "No trusted key for issuer and key id"
                );
                AsError::SignatureInvalid
            })?;

        let claims = crypto::verify_assertion_signature(assertion, &public_key)?;

        let issuer = non_empty(claims.iss, "iss")?;
        let subject = non_empty(claims.sub, "sub")?;
        let exp = claims
            .exp
            .ok_or_else(|| AsError::InvalidAssertion("Missing required claim: exp".to_string()))?;
        let audience = claims
            .aud
            .map(AudienceClaim::into_vec)
            .filter(|aud| !aud.is_empty())
            .ok_or_else(|| AsError::InvalidAssertion("Missing required claim: aud".to_string()))?;

        let now_ts = now.timestamp();
        jwt::validate_exp_at(exp, now_ts).map_err(|_| AsError::AssertionExpired)?;
        let expires_at = timestamp(exp, "exp")?;
        let latest_expiry = now
            .checked_add_signed(self.policy.max_lifetime)
            .ok_or(AsError::Internal)?;
        if expires_at > latest_expiry {
            return Err(AsError::InvalidAssertion(
                "Assertion expiry is too far in the future".to_string(),
            ));
        }

        let issued_at = match claims.iat {
            Some(iat) => {
                jwt::validate_iat_at(iat, self.policy.clock_skew, now_ts)
                    .map_err(|_| AsError::AssertionNotYetValid)?;
                Some(timestamp(iat, "iat")?)
            }
            None if self.policy.require_issued_at => {
                return Err(AsError::InvalidAssertion(
                    "Missing required claim: iat".to_string(),
                ));
            }
            None => None,
        };

        if !audience.iter().any(|aud| aud == &self.policy.token_url) {
            return Err(AsError::InvalidAssertion(
                "Assertion audience does not include the token endpoint".to_string(),
            ));
        }

        let token_id = claims.jti.filter(|jti| !jti.is_empty());
        if token_id.is_none() && self.policy.require_token_id {
            return Err(AsError::InvalidAssertion(
                "Missing required claim: jti".to_string(),
            ));
        }

        Ok(ValidatedAssertion {
            issuer,
            subject,
            audience,
            expires_at,
            issued_at,
            token_id,
            key_id,
        })
    }
}

fn map_pre_verification_error(err: JwtValidationError) -> AsError {
    match err {
        // Without a key id no trusted key can be selected.
        JwtValidationError::MissingKid => AsError::SignatureInvalid,
        JwtValidationError::MissingIssuer => {
            AsError::InvalidAssertion("Missing required claim: iss".to_string())
        }
        JwtValidationError::TokenTooLarge => {
            AsError::InvalidAssertion("Assertion exceeds maximum size".to_string())
        }
        JwtValidationError::MalformedToken
        | JwtValidationError::Expired
        | JwtValidationError::IatInFuture => {
            AsError::InvalidAssertion("Assertion is not a well-formed JWT".to_string())
        }
    }
}

fn non_empty(value: Option<String>, claim: &str) -> Result<String, AsError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AsError::InvalidAssertion(format!("Missing required claim: {}", claim)))
}

fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>, AsError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AsError::InvalidAssertion(format!("Claim {} is out of range", claim)))
}
