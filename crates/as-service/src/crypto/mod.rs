use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::AsError;
use crate::models::KeyAlgorithm;
use common::jwt::AudienceClaim;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, KeyPair},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::instrument;

const ED25519_PUBLIC_KEY_LEN: usize = 32;
const ED25519_SEED_LEN: usize = 32;
/// SEQUENCE header and version 0 of a v1 (RFC 8410) Ed25519 PKCS#8 document.
const PKCS8_V1_HEADER: [u8; 5] = [0x30, 0x2e, 0x02, 0x01, 0x00];
/// SEQUENCE header and version 1 of a v2 (RFC 5958) document with public key.
const PKCS8_V2_HEADER: [u8; 5] = [0x30, 0x53, 0x02, 0x01, 0x01];
/// Ed25519 AlgorithmIdentifier followed by the wrapped 32-byte seed header.
const ED25519_ALGORITHM_AND_SEED: [u8; 11] = [
    0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];
/// `[1]` BIT STRING header of the embedded public key.
const PKCS8_V2_PUBLIC_KEY_HEADER: [u8; 5] = [0xa1, 0x23, 0x03, 0x21, 0x00];
const P256_UNCOMPRESSED_POINT_LEN: usize = 65;

/// Claims of an access token signed by this server.
///
/// The `sub` field identifies an end user or service on whose behalf the
/// token was issued. A custom Debug implementation redacts it.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub client_id: String,
    pub scope: String, // Space-separated scopes
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl fmt::Debug for AccessTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .finish()
    }
}

/// Claims of an inbound JWT bearer assertion.
///
/// Every field is optional at this layer so that a missing claim surfaces as
/// a specific validation failure rather than a parse error.
#[derive(Clone, Default, Deserialize)]
pub struct AssertionClaims {
    pub iss: Option<String>,
    pub sub: Option<String>,
    pub aud: Option<AudienceClaim>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub jti: Option<String>,
}

impl fmt::Debug for AssertionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionClaims")
            .field("iss", &self.iss)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("jti", &self.jti)
            .finish()
    }
}

/// A public key trusted to verify assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// Raw 32-byte Ed25519 public key.
    Ed25519(Vec<u8>),
    /// Uncompressed SEC1 P-256 point (0x04 || X || Y).
    EcdsaP256(Vec<u8>),
}

impl PublicKey {
    /// Build a key from raw bytes, checking the length expected for `algorithm`.
    pub fn from_raw(algorithm: KeyAlgorithm, raw: Vec<u8>) -> Result<Self, AsError> {
        match algorithm {
            KeyAlgorithm::EdDsa if raw.len() == ED25519_PUBLIC_KEY_LEN => {
                Ok(PublicKey::Ed25519(raw))
            }
            KeyAlgorithm::Es256
                if raw.len() == P256_UNCOMPRESSED_POINT_LEN && raw.first() == Some(&0x04) =>
            {
                Ok(PublicKey::EcdsaP256(raw))
            }
            _ => Err(AsError::Crypto(format!(
                "Invalid {} public key ({} bytes)",
                algorithm.as_str(),
                raw.len()
            ))),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            PublicKey::Ed25519(_) => Algorithm::EdDSA,
            PublicKey::EcdsaP256(_) => Algorithm::ES256,
        }
    }

    fn decoding_key(&self) -> DecodingKey {
        match self {
            PublicKey::Ed25519(bytes) => DecodingKey::from_ed_der(bytes),
            PublicKey::EcdsaP256(bytes) => DecodingKey::from_ec_der(bytes),
        }
    }
}

/// Generate EdDSA (Ed25519) keypair using CSPRNG
///
/// Returns (raw_public_key, private_key_pkcs8)
#[instrument(skip_all)]
pub fn generate_signing_key() -> Result<(Vec<u8>, Vec<u8>), AsError> {
    let rng = SystemRandom::new();

    let pkcs8_bytes = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|e| AsError::Crypto(format!("Keypair generation failed: {}", e)))?;

    let public_key = ed25519_public_key(pkcs8_bytes.as_ref())?;

    Ok((public_key, pkcs8_bytes.as_ref().to_vec()))
}

/// Derive the raw public key of a v2 PKCS#8 Ed25519 private key.
pub fn ed25519_public_key(private_key_pkcs8: &[u8]) -> Result<Vec<u8>, AsError> {
    let key_pair = Ed25519KeyPair::from_pkcs8(private_key_pkcs8)
        .map_err(|e| AsError::Crypto(format!("Invalid private key format: {}", e)))?;
    Ok(key_pair.public_key().as_ref().to_vec())
}

/// Bring an Ed25519 PKCS#8 document to the v2 form `jsonwebtoken` signs with.
///
/// v1 documents (as written by `openssl genpkey`) carry only the seed; the
/// public key is derived and embedded. v2 documents are returned unchanged.
pub fn ed25519_pkcs8_v2(private_key_pkcs8: &[u8]) -> Result<Vec<u8>, AsError> {
    if Ed25519KeyPair::from_pkcs8(private_key_pkcs8).is_ok() {
        return Ok(private_key_pkcs8.to_vec());
    }

    let seed = private_key_pkcs8
        .strip_prefix(PKCS8_V1_HEADER.as_slice())
        .and_then(|rest| rest.strip_prefix(ED25519_ALGORITHM_AND_SEED.as_slice()))
        .filter(|seed| seed.len() == ED25519_SEED_LEN)
        .ok_or_else(|| AsError::Crypto("Invalid private key format".to_string()))?;

    let key_pair = Ed25519KeyPair::from_seed_unchecked(seed)
        .map_err(|e| AsError::Crypto(format!("Invalid private key seed: {}", e)))?;

    let mut document = Vec::with_capacity(85);
    document.extend_from_slice(&PKCS8_V2_HEADER);
    document.extend_from_slice(&ED25519_ALGORITHM_AND_SEED);
    document.extend_from_slice(seed);
    document.extend_from_slice(&PKCS8_V2_PUBLIC_KEY_HEADER);
    document.extend_from_slice(key_pair.public_key().as_ref());
    Ok(document)
}

/// Sign access token claims with the server's EdDSA private key
#[instrument(skip_all)]
pub fn sign_access_token(
    claims: &AccessTokenClaims,
    private_key_pkcs8: &[u8],
    key_id: &str,
) -> Result<String, AsError> {
    let encoding_key = EncodingKey::from_ed_der(private_key_pkcs8);

    let mut header = Header::new(Algorithm::EdDSA);
    header.typ = Some("JWT".to_string());
    header.kid = Some(key_id.to_string());

    encode(&header, claims, &encoding_key)
        .map_err(|e| AsError::Crypto(format!("JWT signing operation failed: {}", e)))
}

/// Verify an access token signature with the server's public key.
///
/// Used by resource-server style checks; introspection itself goes through
/// the token store.
#[instrument(skip_all)]
pub fn verify_access_token(token: &str, public_key: &[u8]) -> Result<AccessTokenClaims, AsError> {
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.validate_aud = false;

    decode::<AccessTokenClaims>(token, &DecodingKey::from_ed_der(public_key), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "crypto", error = %e, "Access token verification failed");
            AsError::CallerUnauthorized
        })
}

/// Verify an assertion's signature and decode its claims.
///
/// Only the signature and the header `alg` are checked here; time bounds and
/// claim presence are the validator's job, so the usual jsonwebtoken claim
/// checks are switched off.
#[instrument(skip_all)]
pub fn verify_assertion_signature(
    token: &str,
    public_key: &PublicKey,
) -> Result<AssertionClaims, AsError> {
    let mut validation = Validation::new(public_key.algorithm());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<AssertionClaims>(token, &public_key.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "crypto", error = %e, "Assertion verification failed");
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidEcdsaKey
                | ErrorKind::InvalidKeyFormat
                | ErrorKind::Crypto(_) => AsError::SignatureInvalid,
                _ => AsError::InvalidAssertion("Assertion claims are malformed".to_string()),
            }
        })
}

/// Hash client secret with bcrypt using configurable cost factor.
///
/// # Errors
///
/// Returns `AsError::Crypto` if the cost is outside 10-14 or hashing fails.
#[instrument(skip_all)]
pub fn hash_client_secret(secret: &str, cost: u32) -> Result<String, AsError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(AsError::Crypto(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    bcrypt::hash(secret, cost)
        .map_err(|e| AsError::Crypto(format!("Password hashing failed: {}", e)))
}

/// Verify client secret against bcrypt hash
#[instrument(skip_all)]
pub fn verify_client_secret(secret: &str, hash: &str) -> Result<bool, AsError> {
    bcrypt::verify(secret, hash)
        .map_err(|e| AsError::Crypto(format!("Password verification failed: {}", e)))
}

/// Cost factor encoded in a bcrypt hash (`$2b$<cost>$...`).
pub fn bcrypt_cost_of(hash: &str) -> Option<u32> {
    let mut parts = hash.split('$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(""), Some(_version), Some(cost)) => cost.parse().ok(),
        _ => None,
    }
}
