//! JWT utilities shared by the authorization server crates.
//!
//! This module provides the pre-verification and time-bound helpers used when
//! processing JWT bearer assertions (RFC 7523):
//! - Size limits for DoS prevention
//! - Key ID and issuer extraction from an unverified token (for key lookup)
//! - `exp` / `iat` validation against an explicit `now`
//! - The `aud` claim shape (single string or array)
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Extraction helpers never validate anything; callers MUST verify the
//!   signature with the key they look up
//! - Error messages are generic to prevent information leakage; details are
//!   logged at debug level

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding, JSON parsing
/// or signature verification. Typical assertions are 300-700 bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default tolerance for `iat` claims in the future.
///
/// Zero means an assertion whose `iat` is later than the server clock is
/// rejected outright. Operators may widen this up to [`MAX_CLOCK_SKEW`].
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while pre-processing or time-checking a JWT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The token is invalid")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The token is invalid")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The token is invalid")]
    MissingKid,

    /// Token is missing the `iss` claim.
    #[error("The token is invalid")]
    MissingIssuer,

    /// Token `exp` claim is not in the future.
    #[error("The token has expired")]
    Expired,

    /// Token `iat` claim is in the future (beyond the clock skew tolerance).
    #[error("The token is not yet valid")]
    IatInFuture,
}

// =============================================================================
// Claims Types
// =============================================================================

/// The `aud` claim, which RFC 7519 allows as a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AudienceClaim {
    Single(String),
    Multiple(Vec<String>),
}

impl AudienceClaim {
    /// Flatten into an ordered, de-duplicated list of audiences.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            AudienceClaim::Single(aud) => vec![aud],
            AudienceClaim::Multiple(auds) => crate::scope::dedup(auds),
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact JWT into its three segments after the size check.
fn split_segments(token: &str) -> Result<(&str, &str), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(_signature), None) => Ok((header, payload)),
        _ => {
            tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Decode a base64url JSON segment into a generic JSON value.
fn decode_segment(segment: &str) -> Result<serde_json::Value, JwtValidationError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT segment JSON");
        JwtValidationError::MalformedToken
    })
}

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// The `kid` is only used to select a key from a trusted registry. The token
/// MUST still be verified with the selected key.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds size limit
/// - `MalformedToken` - Token format invalid (wrong structure, bad base64, invalid JSON)
/// - `MissingKid` - Header has no `kid`, or it is empty or not a string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    let (header_part, _) = split_segments(token)?;
    let header = decode_segment(header_part)?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

/// Extract the `iss` claim from a JWT payload without verifying the signature.
///
/// The issuer and `kid` together select the verification key, so the issuer
/// has to be read before the signature can be checked. The value is
/// untrusted until verification succeeds.
///
/// # Errors
///
/// - `TokenTooLarge` / `MalformedToken` as for [`extract_kid`]
/// - `MissingIssuer` - Payload has no non-empty string `iss`
pub fn extract_unverified_issuer(token: &str) -> Result<String, JwtValidationError> {
    let (_, payload_part) = split_segments(token)?;
    let payload = decode_segment(payload_part)?;

    payload
        .get("iss")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingIssuer)
}

/// Validate the `exp` claim against an explicit `now` (Unix seconds).
///
/// An expiry equal to `now` is already expired.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` if `exp <= now`.
pub fn validate_exp_at(exp: i64, now: i64) -> Result<(), JwtValidationError> {
    if exp <= now {
        tracing::debug!(target: "common.jwt", exp = exp, now = now, "Token rejected: expired");
        return Err(JwtValidationError::Expired);
    }
    Ok(())
}

/// Validate the `iat` claim against an explicit `now` with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatInFuture` if `iat` is more than
/// `clock_skew` after `now`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat in the future"
        );
        return Err(JwtValidationError::IatInFuture);
    }

    Ok(())
}

/// Decode a raw public key carried as base64url without padding (JWK `x`
/// for OKP keys, or an uncompressed EC point).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the content cannot be decoded.
pub fn decode_public_key_b64url(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(value.trim())
}

// =============================================================================
// Tests
// =============================================================================
